//! Annotation agents run on each completed hypothesis.
//!
//! - [`SafetyAgent`]: the content-policy checker. Its verdict is stored
//!   verbatim; nothing downstream interprets it.
//! - [`RelationAgent`]: characterises how the hypothesis relates to the
//!   publications retrieved for its short name.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::prompt::{PromptSet, build_policy_prompt, build_relation_prompt};
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::corpus::Passage;
use crate::error::AgentError;

/// Judges text against a content policy.
#[async_trait]
pub trait PolicyChecker: Send + Sync {
    /// Returns a free-text verdict on `text`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the checker cannot be reached.
    async fn judge(&self, text: &str) -> Result<String, AgentError>;
}

/// LLM-backed policy checker.
pub struct SafetyAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    system_prompt: String,
}

impl SafetyAgent {
    /// Creates a checker using the annotation model.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, model: &str, prompts: &PromptSet) -> Self {
        Self {
            provider,
            model: model.to_string(),
            system_prompt: prompts.safety.clone(),
        }
    }
}

#[async_trait]
impl Agent for SafetyAgent {
    fn name(&self) -> &'static str {
        "safety"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        512
    }
}

#[async_trait]
impl PolicyChecker for SafetyAgent {
    async fn judge(&self, text: &str) -> Result<String, AgentError> {
        let response = self
            .execute(self.provider.as_ref(), &build_policy_prompt(text))
            .await
            .map_err(|e| AgentError::PolicyCheck {
                message: e.to_string(),
            })?;
        debug!(chars = response.content.len(), "policy verdict received");
        Ok(response.content)
    }
}

/// Single-shot relation annotator for one hypothesis.
#[derive(Debug, Clone)]
pub struct RelationAgent {
    model: String,
    system_prompt: String,
}

impl RelationAgent {
    /// Creates an annotator whose system prompt names `short_name`.
    #[must_use]
    pub fn new(prompts: &PromptSet, model: &str, short_name: &str) -> Self {
        Self {
            model: model.to_string(),
            system_prompt: prompts.relation_system(short_name),
        }
    }

    /// Describes how the hypothesis relates to `passages`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    pub async fn relate(
        &self,
        provider: &dyn LlmProvider,
        passages: &[Passage],
    ) -> Result<String, AgentError> {
        let response = self
            .execute(provider, &build_relation_prompt(passages))
            .await?;
        Ok(response.content)
    }
}

#[async_trait]
impl Agent for RelationAgent {
    fn name(&self) -> &'static str {
        "relation"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}
