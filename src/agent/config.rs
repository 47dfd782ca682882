//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;

use crate::error::AgentError;

/// Default model for drafting and revising.
const DEFAULT_MODEL: &str = "gpt-4o";
/// Default model for the annotation and retrieval QA calls.
const DEFAULT_ANNOTATION_MODEL: &str = "gpt-4o";
/// Default max tokens per completion.
const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default bound on the revise/search loop.
const DEFAULT_AGENT_ITERATIONS: usize = 2;
/// Default number of hypotheses per session.
const DEFAULT_ITERATIONS: usize = 2;
/// Default number of passages returned per retriever search.
const DEFAULT_SEARCH_TOP_K: usize = 4;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used by the draft and revise responders.
    pub model: String,
    /// Model used for the safety, relation and retrieval QA calls.
    pub annotation_model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Sampling temperature for the draft and revise responders.
    pub temperature: f32,
    /// Revise/search round-trip bound for one cycle.
    ///
    /// A cycle terminates once the trailing run of `ai`/`tool` messages
    /// exceeds this value.
    pub agent_iterations: usize,
    /// Number of outer iterations (hypotheses) per session.
    pub iterations: usize,
    /// Passages retrieved per search.
    pub search_top_k: usize,
    /// Directory containing prompt template files.
    ///
    /// Missing files fall back to compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    annotation_model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    agent_iterations: Option<usize>,
    iterations: Option<usize>,
    search_top_k: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("HYPOGEN_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("HYPOGEN_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("HYPOGEN_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("HYPOGEN_MODEL").ok();
        }
        if self.annotation_model.is_none() {
            self.annotation_model = std::env::var("HYPOGEN_ANNOTATION_MODEL").ok();
        }
        if self.agent_iterations.is_none() {
            self.agent_iterations = std::env::var("HYPOGEN_AGENT_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.iterations.is_none() {
            self.iterations = std::env::var("HYPOGEN_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.search_top_k.is_none() {
            self.search_top_k = std::env::var("HYPOGEN_SEARCH_TOP_K")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("HYPOGEN_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the draft/revise model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the annotation model.
    #[must_use]
    pub fn annotation_model(mut self, model: impl Into<String>) -> Self {
        self.annotation_model = Some(model.into());
        self
    }

    /// Sets the max tokens per completion.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the responder temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the revise/search loop bound.
    #[must_use]
    pub const fn agent_iterations(mut self, n: usize) -> Self {
        self.agent_iterations = Some(n);
        self
    }

    /// Sets the number of outer iterations.
    #[must_use]
    pub const fn iterations(mut self, n: usize) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Sets the passages retrieved per search.
    #[must_use]
    pub const fn search_top_k(mut self, n: usize) -> Self {
        self.search_top_k = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::Config`] if `search_top_k` is zero.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let search_top_k = self.search_top_k.unwrap_or(DEFAULT_SEARCH_TOP_K);
        if search_top_k == 0 {
            return Err(AgentError::Config {
                message: "search_top_k must be at least 1".to_string(),
            });
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            annotation_model: self
                .annotation_model
                .unwrap_or_else(|| DEFAULT_ANNOTATION_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            agent_iterations: self.agent_iterations.unwrap_or(DEFAULT_AGENT_ITERATIONS),
            iterations: self.iterations.unwrap_or(DEFAULT_ITERATIONS),
            search_top_k,
            prompt_dir: self.prompt_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.agent_iterations, DEFAULT_AGENT_ITERATIONS);
        assert_eq!(config.iterations, DEFAULT_ITERATIONS);
        assert_eq!(config.search_top_k, 4);
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("custom")
            .model("gpt-4o-mini")
            .agent_iterations(5)
            .iterations(7)
            .search_top_k(10)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.agent_iterations, 5);
        assert_eq!(config.iterations, 7);
        assert_eq!(config.search_top_k, 10);
    }

    #[test]
    fn test_builder_rejects_zero_top_k() {
        let result = AgentConfig::builder().api_key("k").search_top_k(0).build();
        assert!(matches!(result, Err(AgentError::Config { .. })));
    }
}
