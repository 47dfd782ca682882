//! Tool type definitions for function-calling.
//!
//! The model is steered to structured output by offering it exactly one
//! tool (the target schema) and forcing the choice. Tool calls are also
//! how the model requests searches: the `search_queries` argument of an
//! answer schema is executed by the tool stage.

use serde::{Deserialize, Serialize};

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (doubles as the schema discriminator).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (JSON string on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}
