//! Provider-agnostic message types for LLM communication.
//!
//! A conversation is an ordered, append-only `Vec<Message>`. Its shape is
//! load-bearing: the cycle graph derives its loop depth from the trailing
//! run of `ai`/`tool` messages (see [`trailing_turns`]).

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDefinition};

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions. Only used when assembling a request; never part
    /// of a conversation history.
    System,
    /// Human input (seed prompts, reminders).
    Human,
    /// Model response.
    Ai,
    /// Tool result or corrective feedback.
    Tool,
}

impl Role {
    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "human",
            Self::Ai => "ai",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Tool calls requested by the model (only for `Role::Ai`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool call ID this message responds to (only for `Role::Tool`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Returns the first tool call, if any.
    #[must_use]
    pub fn first_tool_call(&self) -> Option<&ToolCall> {
        self.tool_calls.first()
    }
}

/// A chat completion request (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g., "gpt-4o").
    pub model: String,
    /// Ordered conversation messages, system prompt first.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0–2.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Tool definitions (output schemas) available to the model.
    pub tools: Vec<ToolDefinition>,
    /// Name of the tool the model must call, steering it to a schema.
    pub tool_choice: Option<String>,
    /// Trace tags (e.g., `attempt:1`). Logged, not sent upstream.
    pub tags: Vec<String>,
}

/// Token usage statistics from a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated in the completion.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

/// A chat completion response (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated text content.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCall>,
    /// Finish reason from the model (e.g., `"stop"`, `"tool_calls"`).
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Converts the response into an `ai` history message.
    #[must_use]
    pub fn into_message(self) -> Message {
        Message {
            role: Role::Ai,
            content: self.content,
            tool_calls: self.tool_calls,
            tool_call_id: None,
        }
    }
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> Message {
    Message {
        role: Role::System,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

/// Creates a human message.
#[must_use]
pub fn human_message(content: &str) -> Message {
    Message {
        role: Role::Human,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

/// Creates an `ai` message with tool calls and optional text.
#[must_use]
pub fn ai_message(content: &str, tool_calls: Vec<ToolCall>) -> Message {
    Message {
        role: Role::Ai,
        content: content.to_string(),
        tool_calls,
        tool_call_id: None,
    }
}

/// Creates a tool result message.
#[must_use]
pub fn tool_message(tool_call_id: &str, content: &str) -> Message {
    Message {
        role: Role::Tool,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: Some(tool_call_id.to_string()),
    }
}

/// Counts consecutive `ai`/`tool` messages at the end of `history`.
///
/// Scans backwards and stops at the first message of any other role.
#[must_use]
pub fn trailing_turns(history: &[Message]) -> usize {
    history
        .iter()
        .rev()
        .take_while(|m| matches!(m.role, Role::Ai | Role::Tool))
        .count()
}
