//! Output formatting for CLI results.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::{RunStop, SessionReport};
use crate::corpus::Passage;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
    }
}

/// Characters of passage text shown in search listings.
const PREVIEW_LEN: usize = 160;

/// Formats corpus search hits.
#[must_use]
pub fn format_passages(query: &str, passages: &[Passage], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if passages.is_empty() {
                return format!("No passages found for: {query}\n");
            }
            let mut out = format!("{} passage(s) for: {query}\n\n", passages.len());
            for (i, p) in passages.iter().enumerate() {
                let _ = writeln!(out, "{}. [{}] {} (score {:.3})", i + 1, p.id, p.title, p.score);
                if !p.source.is_empty() {
                    let _ = writeln!(out, "   source: {}", p.source);
                }
                let _ = writeln!(out, "   {}\n", preview(&p.text));
            }
            out
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "query": query,
            "count": passages.len(),
            "results": passages,
        })),
    }
}

/// Formats a finished generation session.
#[must_use]
pub fn format_report(report: &SessionReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for (i, row) in report.table.rows().iter().enumerate() {
                let _ = writeln!(out, "## {}. {}\n", i + 1, row.short_name);
                let _ = writeln!(out, "{}\n", row.answer);
                let _ = writeln!(out, "Novelty:      {}", row.novelty_score);
                let _ = writeln!(out, "Not novel:    {}", row.not_novel);
                let _ = writeln!(out, "Missing:      {}", row.missing);
                let _ = writeln!(out, "Superfluous:  {}", row.superfluous);
                let _ = writeln!(out, "Flag:         {}", row.flag);
                let _ = writeln!(out, "References:   {}", row.references);
                let _ = writeln!(out, "Safety:       {}", row.safety_annotation);
                let _ = writeln!(out, "Literature:   {}\n", row.literature_relation);
            }
            match &report.stop {
                RunStop::Completed => {
                    let _ = writeln!(out, "---\nGenerated {} hypothesis(es).", report.table.len());
                }
                RunStop::Aborted { iteration, error } => {
                    let _ = writeln!(
                        out,
                        "---\nStopped at iteration {iteration} after {} hypothesis(es): {error}",
                        report.table.len()
                    );
                }
            }
            out
        }
        OutputFormat::Json => format.to_json(report),
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_LEN {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_LEN).collect();
        format!("{cut}...")
    }
}
