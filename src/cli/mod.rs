//! CLI layer for hypogen-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! generating hypotheses, managing the literature corpus and editing
//! prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, CorpusCommands, GenerateArgs, PromptCommands};
