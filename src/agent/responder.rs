//! Structured-output responder with bounded corrective retries.
//!
//! Each attempt sends the actor system prompt, the history and a trailing
//! reminder, with the target schema as the only (forced) tool. A response
//! that fails validation is appended to a local copy of the history with a
//! corrective message, and the model is asked again. The local copy is
//! discarded: callers only ever see the returned message.

use chrono::Local;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::message::{ChatRequest, Message, human_message, system_message, tool_message};
use super::prompt::{PromptSet, build_corrective_prompt};
use super::provider::LlmProvider;
use super::schema::SchemaKind;
use crate::core::HypothesisContext;
use crate::error::AgentError;

/// Attempts per `respond` call, including the first.
pub const MAX_ATTEMPTS: usize = 3;

/// Reply for tool calls after the first in an invalid response.
const IGNORED_CALL_NOTE: &str = "Ignored: only one function call is accepted per response.";

/// Invokes the model until its output binds to one schema.
#[derive(Debug, Clone)]
pub struct ValidatingResponder {
    schema: SchemaKind,
    model: String,
    temperature: f32,
    max_tokens: u32,
    prompts: PromptSet,
    context: HypothesisContext,
}

impl ValidatingResponder {
    /// Creates a responder targeting `schema`.
    #[must_use]
    pub fn new(
        schema: SchemaKind,
        config: &AgentConfig,
        prompts: PromptSet,
        context: HypothesisContext,
    ) -> Self {
        Self {
            schema,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            prompts,
            context,
        }
    }

    /// Schema this responder validates against.
    #[must_use]
    pub const fn schema(&self) -> SchemaKind {
        self.schema
    }

    /// Produces the next `ai` message for `history`.
    ///
    /// Returns the first response that validates. After [`MAX_ATTEMPTS`]
    /// failures the last response is returned as-is; invalid output is never
    /// an error here.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the provider call itself fails. Such faults
    /// are not retried.
    pub async fn respond(
        &self,
        provider: &dyn LlmProvider,
        history: &[Message],
    ) -> Result<Message, AgentError> {
        let mut local = history.to_vec();
        let mut attempt = 0;

        loop {
            let request = self.build_request(&local, attempt);
            let response = provider.chat(&request).await?.into_message();

            let error = match self.schema.validate(&response) {
                Ok(_) => {
                    debug!(schema = %self.schema, attempt, "structured output validated");
                    return Ok(response);
                }
                Err(error) => error,
            };

            attempt += 1;
            if attempt >= MAX_ATTEMPTS {
                warn!(
                    schema = %self.schema,
                    attempts = attempt,
                    errors = error.errors.len(),
                    "structured output still invalid; returning last response"
                );
                return Ok(response);
            }

            debug!(schema = %self.schema, attempt, %error, "structured output invalid; retrying");
            let correctives = corrective_messages(&response, &build_corrective_prompt(&error));
            local.push(response);
            local.extend(correctives);
        }
    }

    fn build_request(&self, history: &[Message], attempt: usize) -> ChatRequest {
        let time = Local::now().to_rfc3339();
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(system_message(&self.prompts.actor_system(
            &self.context,
            self.schema,
            &time,
        )));
        messages.extend_from_slice(history);
        messages.push(human_message(&self.prompts.reminder(self.schema)));

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            tools: vec![self.schema.definition()],
            tool_choice: Some(self.schema.name().to_string()),
            tags: vec![format!("attempt:{attempt}")],
        }
    }
}

/// Reply to an invalid response: the feedback goes to its first tool call,
/// and every further call gets [`IGNORED_CALL_NOTE`] so no call id is left
/// unanswered. A response without tool calls gets the feedback as `human`.
fn corrective_messages(response: &Message, feedback: &str) -> Vec<Message> {
    let mut calls = response.tool_calls.iter();
    let Some(first) = calls.next() else {
        return vec![human_message(feedback)];
    };
    let mut messages = Vec::with_capacity(response.tool_calls.len());
    messages.push(tool_message(&first.id, feedback));
    messages.extend(calls.map(|call| tool_message(&call.id, IGNORED_CALL_NOTE)));
    messages
}
