//! Reflexion agent for hypothesis generation.
//!
//! Drives an LLM through bounded draft, search and revise cycles, then
//! annotates and tabulates each result. Uses a pluggable provider
//! abstraction backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! IterationController (× iterations, feeds known concepts forward)
//!   ├── CycleGraph
//!   │   ├── Draft      → ValidatingResponder(AnswerQuestion) ⇄ model
//!   │   ├── Execute    → ToolExecutor → Retriever::answer per query
//!   │   └── Revise     → ValidatingResponder(ReviseAnswer) ⇄ model
//!   ├── PolicyChecker  → safety annotation
//!   └── Retriever::search + RelationAgent → literature relation
//! ```

pub mod annotate;
pub mod client;
pub mod config;
pub mod controller;
pub mod executor;
pub mod graph;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod responder;
pub mod retriever;
pub mod schema;
#[cfg(test)]
mod testing;
pub mod tool;
pub mod traits;

// Re-export key types
pub use annotate::{PolicyChecker, RelationAgent, SafetyAgent};
pub use client::create_provider;
pub use config::AgentConfig;
pub use controller::{IterationController, RunEvent, RunStop, SessionReport};
pub use executor::ToolExecutor;
pub use graph::{CycleGraph, CycleState, next_state};
pub use message::{ChatRequest, ChatResponse, Message, Role, TokenUsage};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use responder::{MAX_ATTEMPTS, ValidatingResponder};
pub use retriever::{CorpusRetriever, Retriever};
pub use schema::{
    AnswerRecord, FieldError, Reflection, RevisedAnswerRecord, SchemaKind, StructuredAnswer,
    ValidationError,
};
pub use tool::{ToolCall, ToolDefinition, ToolResult};
pub use traits::{Agent, AgentResponse};
