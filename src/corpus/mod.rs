//! Literature corpus backing the retriever.

pub mod ingest;
pub mod store;

pub use ingest::{IngestReport, ingest_path};
pub use store::{CorpusStore, NewPassage, Passage};
