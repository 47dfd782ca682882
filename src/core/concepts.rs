//! Known-concepts accumulator.
//!
//! Each completed outer iteration appends its hypothesis `short_name` so the
//! next seed steers the model away from it. Names are joined with no
//! delimiter, exactly as they arrive.

use serde::{Deserialize, Serialize};

/// Growing text of concepts already generated in this session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownConcepts(String);

impl KnownConcepts {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self(String::new())
    }

    /// Appends a short name verbatim.
    pub fn push(&mut self, short_name: &str) {
        self.0.push_str(short_name);
    }

    /// Returns the accumulated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if nothing has been accumulated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for KnownConcepts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
