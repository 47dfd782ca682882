//! Error types for hypogen-rs.
//!
//! Each layer has its own error enum; [`Error`] unifies them for the CLI.
//! Schema validation failures are deliberately absent here: they are
//! values ([`crate::agent::schema::ValidationError`]) handled inside the
//! responder, never faults that unwind a run.

use thiserror::Error;

/// Convenience alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// Corpus storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Agent, provider or retriever failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the agent system.
///
/// Every variant is fatal for the outer iteration it occurs in.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured.
    #[error("API key missing: set OPENAI_API_KEY or HYPOGEN_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is not known.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// The model endpoint rejected or failed a request.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error description from the transport or SDK.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The retriever failed to search or answer.
    #[error("retrieval failed for '{query}': {message}")]
    Retrieval {
        /// The query that failed.
        query: String,
        /// Failure description.
        message: String,
    },

    /// The content-policy checker failed.
    #[error("policy check failed: {message}")]
    PolicyCheck {
        /// Failure description.
        message: String,
    },

    /// A model response could not be interpreted at all.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What was wrong.
        message: String,
        /// The raw content that failed to parse.
        content: String,
    },

    /// Invalid agent configuration.
    #[error("invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
}

/// Errors raised by the SQLite-backed literature corpus.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The corpus has not been initialized.
    #[error("corpus not initialized at {path}; run `hypogen-rs corpus ingest` first")]
    NotInitialized {
        /// Database path.
        path: String,
    },

    /// A source document could not be read or decoded.
    #[error("failed to ingest {path}: {message}")]
    Ingest {
        /// Source path.
        path: String,
        /// Failure description.
        message: String,
    },
}

/// Errors raised while executing CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),
}
