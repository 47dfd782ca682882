//! Output table of generated hypotheses.
//!
//! One [`HypothesisRow`] per completed outer iteration, in generation order.
//! Field order on the row struct is the column order of every export.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::schema::Reflection;

/// Column names, in export order.
pub const COLUMNS: [&str; 10] = [
    "short_name",
    "answer",
    "novelty_score",
    "not_novel",
    "missing",
    "superfluous",
    "flag",
    "references",
    "safety_annotation",
    "literature_relation",
];

/// A single generated hypothesis with its annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisRow {
    /// One-sentence summary of the hypothesis.
    pub short_name: String,
    /// The hypothesis text.
    pub answer: String,
    /// Self-assessed novelty, free text.
    pub novelty_score: String,
    /// What is already published.
    pub not_novel: String,
    /// What is missing.
    pub missing: String,
    /// What is superfluous.
    pub superfluous: String,
    /// Sanity judgment on the inputs and hypothesis.
    pub flag: String,
    /// References named by the model.
    pub references: String,
    /// Verbatim verdict of the content-policy checker.
    pub safety_annotation: String,
    /// How the hypothesis relates to retrieved literature.
    pub literature_relation: String,
}

impl HypothesisRow {
    /// Builds a row from a final answer and its two annotations.
    #[must_use]
    pub fn new(
        answer: String,
        reflection: Reflection,
        safety_annotation: String,
        literature_relation: String,
    ) -> Self {
        let Reflection {
            missing,
            superfluous,
            not_novel,
            short_name,
            novelty_score,
            references,
            flag,
        } = reflection;
        Self {
            short_name,
            answer,
            novelty_score,
            not_novel,
            missing,
            superfluous,
            flag,
            references,
            safety_annotation,
            literature_relation,
        }
    }

    /// Returns the cells in column order.
    #[must_use]
    pub fn cells(&self) -> [&str; 10] {
        [
            &self.short_name,
            &self.answer,
            &self.novelty_score,
            &self.not_novel,
            &self.missing,
            &self.superfluous,
            &self.flag,
            &self.references,
            &self.safety_annotation,
            &self.literature_relation,
        ]
    }
}

/// Append-only table of hypothesis rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HypothesisTable {
    rows: Vec<HypothesisRow>,
}

impl HypothesisTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Appends a row at the end.
    pub fn push(&mut self, row: HypothesisRow) {
        self.rows.push(row);
    }

    /// Returns the rows in generation order.
    #[must_use]
    pub fn rows(&self) -> &[HypothesisRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no row has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the header and every row as CSV.
    ///
    /// The header is written even when the table is empty.
    ///
    /// # Errors
    ///
    /// Returns a [`csv::Error`] if writing or serialization fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(COLUMNS)?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the table as CSV to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns a [`csv::Error`] if the file cannot be created or written.
    pub fn write_csv_path(&self, path: &Path) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

impl<'a> IntoIterator for &'a HypothesisTable {
    type Item = &'a HypothesisRow;
    type IntoIter = std::slice::Iter<'a, HypothesisRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn reflection(short_name: &str) -> Reflection {
        Reflection {
            missing: "m".to_string(),
            superfluous: "s".to_string(),
            not_novel: "n".to_string(),
            short_name: short_name.to_string(),
            novelty_score: "7".to_string(),
            references: "PMID 1".to_string(),
            flag: "ok".to_string(),
        }
    }

    #[test]
    fn test_row_maps_reflection_fields() {
        let row = HypothesisRow::new(
            "answer text".to_string(),
            reflection("Idea"),
            "no restricted topics".to_string(),
            "extends prior work".to_string(),
        );
        assert_eq!(
            row.cells(),
            [
                "Idea",
                "answer text",
                "7",
                "n",
                "m",
                "s",
                "ok",
                "PMID 1",
                "no restricted topics",
                "extends prior work"
            ]
        );
    }

    #[test]
    fn test_table_appends_in_order() {
        let mut table = HypothesisTable::new();
        assert!(table.is_empty());
        for name in ["A", "B", "C"] {
            table.push(HypothesisRow::new(
                String::new(),
                reflection(name),
                String::new(),
                String::new(),
            ));
        }
        let names: Vec<&str> = table.into_iter().map(|r| r.short_name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let mut table = HypothesisTable::new();
        table.push(HypothesisRow::new(
            "line one\nline two, with comma".to_string(),
            reflection("Idea"),
            "safe".to_string(),
            "related".to_string(),
        ));

        let mut buf = Vec::new();
        table
            .write_csv(&mut buf)
            .unwrap_or_else(|e| panic!("write_csv failed: {e}"));
        let text = String::from_utf8(buf).unwrap_or_else(|e| panic!("not utf-8: {e}"));

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(COLUMNS.join(",").as_str()));
        assert!(text.contains("\"line one\nline two, with comma\""));

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let rows: Vec<HypothesisRow> = rdr
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap_or_else(|e| panic!("read back failed: {e}"));
        assert_eq!(rows, table.rows());
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let mut buf = Vec::new();
        HypothesisTable::new()
            .write_csv(&mut buf)
            .unwrap_or_else(|e| panic!("write_csv failed: {e}"));
        assert_eq!(String::from_utf8_lossy(&buf).trim_end(), COLUMNS.join(","));
    }

    #[test]
    fn test_json_is_array_of_rows() {
        let mut table = HypothesisTable::new();
        table.push(HypothesisRow::default());
        let json = serde_json::to_value(&table).unwrap_or_default();
        assert_eq!(json.as_array().map(Vec::len), Some(1));
        assert!(json[0].get("literature_relation").is_some());
    }
}
