//! Session data: research context, known concepts and the output table.

pub mod concepts;
pub mod context;
pub mod table;

pub use concepts::KnownConcepts;
pub use context::HypothesisContext;
pub use table::{COLUMNS, HypothesisRow, HypothesisTable};
