//! Document retriever consumed by the tool stage and the relation annotation.
//!
//! [`CorpusRetriever`] wraps the SQLite literature corpus. `answer` is
//! retrieve-then-read: the top passages for the question go into a
//! single-shot QA call.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use super::config::AgentConfig;
use super::message::Message;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::corpus::{CorpusStore, Passage};
use crate::error::AgentError;

/// Searches a document collection.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns ranked passages for `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] if the collection cannot be searched.
    async fn search(&self, query: &str) -> Result<Vec<Passage>, AgentError>;

    /// Answers `question` from retrieved passages.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if retrieval or the answering call fails.
    async fn answer(&self, chat_history: &[Message], question: &str)
    -> Result<String, AgentError>;
}

/// Retriever over a [`CorpusStore`].
pub struct CorpusRetriever {
    store: Mutex<CorpusStore>,
    provider: Arc<dyn LlmProvider>,
    model: String,
    prompts: PromptSet,
    top_k: usize,
}

impl CorpusRetriever {
    /// Creates a retriever using the annotation model for QA.
    #[must_use]
    pub fn new(
        store: CorpusStore,
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            provider,
            model: config.annotation_model.clone(),
            prompts,
            top_k: config.search_top_k,
        }
    }

    fn search_store(&self, query: &str) -> Result<Vec<Passage>, AgentError> {
        let store = self.store.lock().map_err(|_| AgentError::Retrieval {
            query: query.to_string(),
            message: "corpus lock poisoned".to_string(),
        })?;
        store
            .search(query, self.top_k)
            .map_err(|e| AgentError::Retrieval {
                query: query.to_string(),
                message: e.to_string(),
            })
    }
}

impl std::fmt::Debug for CorpusRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusRetriever")
            .field("model", &self.model)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Retriever for CorpusRetriever {
    async fn search(&self, query: &str) -> Result<Vec<Passage>, AgentError> {
        let passages = self.search_store(query)?;
        debug!(query, hits = passages.len(), "retrieved passages");
        Ok(passages)
    }

    async fn answer(
        &self,
        chat_history: &[Message],
        question: &str,
    ) -> Result<String, AgentError> {
        let passages = self.search_store(question)?;
        let qa = QaAgent {
            model: &self.model,
            system_prompt: self.prompts.qa_system(&passages),
        };
        let response = qa
            .execute_with_history(self.provider.as_ref(), chat_history, question)
            .await?;
        debug!(question, passages = passages.len(), "answered from corpus");
        Ok(response.content)
    }
}

/// Retrieval QA call over a fixed set of passages.
struct QaAgent<'a> {
    model: &'a str,
    system_prompt: String,
}

#[async_trait]
impl Agent for QaAgent<'_> {
    fn name(&self) -> &'static str {
        "qa"
    }

    fn model(&self) -> &str {
        self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::testing::{ScriptedProvider, text_response};
    use crate::corpus::NewPassage;

    fn retriever(provider: Arc<ScriptedProvider>) -> CorpusRetriever {
        let mut store = CorpusStore::in_memory().unwrap_or_else(|e| panic!("in_memory: {e}"));
        store.init().unwrap_or_else(|e| panic!("init: {e}"));
        for (title, text) in [
            ("parp", "PARP inhibitors are synthetically lethal with BRCA1 loss."),
            ("wee1", "WEE1 inhibition forces premature mitosis."),
        ] {
            store
                .add_passage(&NewPassage {
                    title: title.to_string(),
                    text: text.to_string(),
                    source: String::new(),
                })
                .unwrap_or_else(|e| panic!("add: {e}"));
        }
        let config = AgentConfig::builder()
            .api_key("test")
            .annotation_model("qa-model")
            .search_top_k(1)
            .build()
            .unwrap_or_else(|_| unreachable!());
        CorpusRetriever::new(store, provider, &config, PromptSet::defaults())
    }

    #[tokio::test]
    async fn test_search_honours_top_k() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let retriever = retriever(provider.clone());
        let hits = retriever
            .search("PARP BRCA1 WEE1")
            .await
            .unwrap_or_else(|e| panic!("search: {e}"));
        assert_eq!(hits.len(), 1);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_answer_reads_retrieved_passages() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response(
            "PARP inhibitors exploit BRCA1 loss.",
        )]));
        let retriever = retriever(provider.clone());

        let answer = retriever
            .answer(&[], "What is lethal with BRCA1 loss?")
            .await
            .unwrap_or_else(|e| panic!("answer: {e}"));
        assert_eq!(answer, "PARP inhibitors exploit BRCA1 loss.");

        let requests = provider.requests();
        let request = &requests[0];
        assert_eq!(request.model, "qa-model");
        assert!(request.messages[0].content.contains("[1] parp"));
        assert_eq!(
            request.messages.last().map(|m| m.content.as_str()),
            Some("What is lethal with BRCA1 loss?")
        );
    }

    #[tokio::test]
    async fn test_answer_propagates_endpoint_errors() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let retriever = retriever(provider);
        let result = retriever.answer(&[], "PARP").await;
        assert!(matches!(result, Err(AgentError::ApiRequest { .. })));
    }
}
