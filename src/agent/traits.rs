//! Agent trait definition.
//!
//! Single-shot agents (policy checker, relation annotator, retrieval QA)
//! implement this trait: a fixed system prompt and model, one request, the
//! reply text back. The validating responders do not; they need forced
//! tool choice and a retry loop (see [`super::responder`]).

use async_trait::async_trait;

use super::message::{ChatRequest, Message, TokenUsage, human_message, system_message};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by single-shot agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        self.execute_with_history(provider, &[], user_msg).await
    }

    /// Executes the agent with prior conversation turns before the user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute_with_history(
        &self,
        provider: &dyn LlmProvider,
        history: &[Message],
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(system_message(self.system_prompt()));
        messages.extend_from_slice(history);
        messages.push(human_message(user_msg));

        let request = ChatRequest {
            model: self.model().to_string(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            tools: Vec::new(),
            tool_choice: None,
            tags: vec![format!("agent:{}", self.name())],
        };

        let response = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
