//! # hypogen-rs
//!
//! Reflexion-style research hypothesis generator.
//!
//! An LLM drafts a hypothesis as a structured answer with a self-critique
//! and search queries, the queries run against a local literature corpus,
//! and the model revises with citations until a bounded number of round
//! trips is reached. Each finished hypothesis is annotated for safety and
//! for its relation to the literature, then appended to a table. Its short
//! name is fed into the next cycle's seed so later hypotheses differ.
//!
//! ## Modules
//!
//! - [`agent`]: provider abstraction, structured output, cycle graph and
//!   iteration controller
//! - [`core`]: research context, known concepts and the output table
//! - [`corpus`]: SQLite FTS5 literature store and file ingest
//! - [`cli`]: command-line interface
//! - [`error`]: error types

pub mod agent;
pub mod cli;
pub mod core;
pub mod corpus;
pub mod error;

pub use agent::{AgentConfig, IterationController, RunStop, SessionReport};
pub use core::{HypothesisContext, HypothesisRow, HypothesisTable, KnownConcepts};
pub use error::{Error, Result};
