//! Loading literature files into the corpus.
//!
//! Supported inputs:
//!
//! - `.txt` / `.md`: the whole file is one passage, titled by its stem.
//! - `.jsonl`: one passage per non-blank line, each an object with a
//!   `text` field (alias `abstract`) and an optional `title`.
//!
//! Directories are walked recursively in sorted order; files with other
//! extensions are skipped there but rejected when named explicitly.
//! Symlinked directories are not followed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::store::{CorpusStore, NewPassage};
use crate::error::StorageError;

/// Summary of an ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Files read.
    pub files: usize,
    /// Passages added.
    pub passages: usize,
    /// Files skipped for an unsupported extension.
    pub skipped: usize,
}

#[derive(Deserialize)]
struct JsonlRecord {
    #[serde(default)]
    title: String,
    #[serde(alias = "abstract")]
    text: String,
}

/// Ingests a file or directory into `store`.
///
/// All passages of one call are committed in a single transaction.
///
/// # Errors
///
/// Returns [`StorageError::Ingest`] if a file cannot be read or a JSONL line
/// is malformed, and [`StorageError::Database`] on SQLite failure.
pub fn ingest_path(store: &mut CorpusStore, path: &Path) -> Result<IngestReport, StorageError> {
    let mut report = IngestReport::default();
    let mut passages = Vec::new();

    if path.is_dir() {
        for file in walk(path)? {
            if is_supported(&file) {
                passages.extend(read_passages(&file)?);
                report.files += 1;
            } else {
                debug!(path = %file.display(), "skipping unsupported file");
                report.skipped += 1;
            }
        }
    } else {
        if !is_supported(path) {
            return Err(ingest_error(path, "unsupported extension (expected .txt, .md or .jsonl)"));
        }
        passages = read_passages(path)?;
        report.files = 1;
    }

    report.passages = store.add_passages(&passages)?;
    info!(
        path = %path.display(),
        files = report.files,
        passages = report.passages,
        "ingested literature"
    );
    Ok(report)
}

/// Reads the passages contained in a single supported file.
///
/// # Errors
///
/// Returns [`StorageError::Ingest`] on read or parse failure.
pub fn read_passages(path: &Path) -> Result<Vec<NewPassage>, StorageError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ingest_error(path, &e.to_string()))?;
    let source = path.display().to_string();

    if extension(path).as_deref() == Some("jsonl") {
        let mut passages = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: JsonlRecord = serde_json::from_str(line)
                .map_err(|e| ingest_error(path, &format!("line {}: {e}", n + 1)))?;
            if record.text.trim().is_empty() {
                continue;
            }
            passages.push(NewPassage {
                title: record.title,
                text: record.text,
                source: format!("{source}:{}", n + 1),
            });
        }
        return Ok(passages);
    }

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(vec![NewPassage {
        title,
        text: content,
        source,
    }])
}

fn walk(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| ingest_error(dir, &e.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut files = Vec::new();
    for entry in entries {
        let is_link = std::fs::symlink_metadata(&entry)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_link && entry.is_dir() {
            debug!(path = %entry.display(), "not following symlinked directory");
        } else if entry.is_dir() {
            files.extend(walk(&entry)?);
        } else {
            files.push(entry);
        }
    }
    Ok(files)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn is_supported(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("txt" | "md" | "jsonl"))
}

fn ingest_error(path: &Path, message: &str) -> StorageError {
    StorageError::Ingest {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}
