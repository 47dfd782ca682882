//! SQLite literature store with an FTS5 index.
//!
//! Passages live in a single FTS5 virtual table; ranking is the built-in
//! `bm25()` function, so lower raw ranks are better. [`Passage::score`]
//! is the negated rank so that higher means more relevant.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::StorageError;

const SCHEMA: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS passages USING fts5(
    title,
    body,
    source UNINDEXED,
    tokenize = 'porter unicode61'
);
";

/// A passage to be added to the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPassage {
    /// Title (file stem or record title).
    pub title: String,
    /// Passage text.
    pub text: String,
    /// Where the passage came from.
    pub source: String,
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Row id in the corpus.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Passage text.
    pub text: String,
    /// Origin path.
    pub source: String,
    /// Relevance, higher is better.
    pub score: f64,
}

/// Persistent passage store.
pub struct CorpusStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl CorpusStore {
    /// Opens (or creates) a corpus database file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if SQLite cannot open the file.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a throwaway in-memory corpus.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// Creates the schema if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn init(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Returns `true` if the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn is_initialized(&self) -> Result<bool, StorageError> {
        let n: i64 = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'passages'",
            [],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    /// Fails with [`StorageError::NotInitialized`] unless the schema exists.
    ///
    /// # Errors
    ///
    /// See above; also [`StorageError::Database`] on SQLite failure.
    pub fn ensure_initialized(&self) -> Result<(), StorageError> {
        if self.is_initialized()? {
            Ok(())
        } else {
            Err(StorageError::NotInitialized {
                path: self.display_path(),
            })
        }
    }

    /// Adds a single passage and returns its row id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn add_passage(&mut self, passage: &NewPassage) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO passages (title, body, source) VALUES (?1, ?2, ?3)",
            params![passage.title, passage.text, passage.source],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Adds passages in one transaction and returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure; nothing is
    /// committed in that case.
    pub fn add_passages(&mut self, passages: &[NewPassage]) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO passages (title, body, source) VALUES (?1, ?2, ?3)")?;
            for p in passages {
                stmt.execute(params![p.title, p.text, p.source])?;
            }
        }
        tx.commit()?;
        Ok(passages.len())
    }

    /// Number of passages in the corpus.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn count(&self) -> Result<usize, StorageError> {
        let n: i64 = self
            .conn
            .query_row("SELECT count(*) FROM passages", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Returns the `top_k` best passages for `query`, best first.
    ///
    /// Query words are matched with OR semantics; a query with no words
    /// returns no passages.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, StorageError> {
        let Some(expr) = match_expression(query) else {
            return Ok(Vec::new());
        };
        debug!(query, %expr, top_k, "corpus search");

        let limit = i64::try_from(top_k).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT rowid, title, body, source, bm25(passages) AS rank
             FROM passages
             WHERE passages MATCH ?1
             ORDER BY rank
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![expr, limit], |row| {
            let rank: f64 = row.get(4)?;
            Ok(Passage {
                id: row.get(0)?,
                title: row.get(1)?,
                text: row.get(2)?,
                source: row.get(3)?,
                score: -rank,
            })
        })?;
        let passages = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(passages)
    }

    /// Path of the backing file, or `:memory:`.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string())
    }
}

impl std::fmt::Debug for CorpusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusStore")
            .field("path", &self.display_path())
            .finish_non_exhaustive()
    }
}

/// Builds an FTS5 match expression: every word quoted, joined with `OR`.
fn match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .unicode_words()
        .map(|w| format!("\"{}\"", w.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}
