//! Shared doubles for the integration tests.

#![allow(dead_code, clippy::panic)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use hypogen_rs::agent::{
    ChatRequest, ChatResponse, Message, PolicyChecker, Retriever, TokenUsage, ToolCall,
};
use hypogen_rs::corpus::Passage;
use hypogen_rs::error::AgentError;
use serde_json::{Value, json};

/// Model double that answers by request kind.
///
/// Draft and revise requests get a valid structured answer named after the
/// current iteration; plain requests (annotations) get canned text.
pub struct RoutedProvider {
    names: Vec<String>,
    drafts: AtomicUsize,
    fail_on_draft: Option<usize>,
    seeds: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl RoutedProvider {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(ToString::to_string).collect(),
            drafts: AtomicUsize::new(0),
            fail_on_draft: None,
            seeds: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails the `n`th (1-based) draft request with a transport error.
    pub fn failing_on_draft(mut self, n: usize) -> Self {
        self.fail_on_draft = Some(n);
        self
    }

    /// Seed texts seen by draft requests, in order.
    pub fn seeds(&self) -> Vec<String> {
        self.seeds.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn current_name(&self) -> String {
        let n = self.drafts.load(Ordering::SeqCst).max(1);
        self.names
            .get(n - 1)
            .cloned()
            .unwrap_or_else(|| format!("idea {n}"))
    }
}

#[async_trait]
impl hypogen_rs::agent::LlmProvider for RoutedProvider {
    fn name(&self) -> &'static str {
        "routed"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match request.tool_choice.as_deref() {
            Some("AnswerQuestion") => {
                let n = self.drafts.fetch_add(1, Ordering::SeqCst) + 1;
                if let Ok(mut seeds) = self.seeds.lock() {
                    seeds.push(request.messages[1].content.clone());
                }
                if self.fail_on_draft == Some(n) {
                    return Err(AgentError::ApiRequest {
                        message: "upstream unavailable".to_string(),
                        status: Some(503),
                    });
                }
                Ok(tool_response("draft", "AnswerQuestion", &draft_args(&self.current_name())))
            }
            Some("ReviseAnswer") => Ok(tool_response(
                "revise",
                "ReviseAnswer",
                &revise_args(&self.current_name()),
            )),
            Some(other) => panic!("unexpected tool choice {other}"),
            None => Ok(text_response(&format!("relates to {}", self.current_name()))),
        }
    }
}

pub fn text_response(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        usage: TokenUsage::default(),
        tool_calls: Vec::new(),
        finish_reason: Some("stop".to_string()),
    }
}

pub fn tool_response(id: &str, name: &str, args: &Value) -> ChatResponse {
    ChatResponse {
        content: String::new(),
        usage: TokenUsage::default(),
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: args.to_string(),
        }],
        finish_reason: Some("tool_calls".to_string()),
    }
}

pub fn draft_args(short_name: &str) -> Value {
    json!({
        "answer": format!("Hypothesis: {short_name}"),
        "reflection": {
            "missing": "dose response",
            "superfluous": "none",
            "not_novel": "PARP inhibition",
            "short_name": short_name,
            "novelty_score": 7,
            "references": "PMID 123",
            "flag": "inputs are real genes"
        },
        "search_queries": [format!("{short_name} evidence"), "BRCA1 synthetic lethality"]
    })
}

pub fn revise_args(short_name: &str) -> Value {
    let mut args = draft_args(short_name);
    args["citations"] = json!(["[1] PMID 123"]);
    args
}

/// Retriever returning canned answers and one passage per search.
#[derive(Default)]
pub struct StubRetriever {
    pub questions: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<String>>,
    /// 1-based `search` call that fails.
    pub fail_search_on: Option<usize>,
}

#[async_trait]
impl Retriever for StubRetriever {
    async fn search(&self, query: &str) -> Result<Vec<Passage>, AgentError> {
        let call = match self.searches.lock() {
            Ok(mut s) => {
                s.push(query.to_string());
                s.len()
            }
            Err(_) => 0,
        };
        if self.fail_search_on == Some(call) {
            return Err(AgentError::Retrieval {
                query: query.to_string(),
                message: "corpus locked".to_string(),
            });
        }
        Ok(vec![Passage {
            id: 1,
            title: "Synthetic lethality review".to_string(),
            text: format!("Background on {query}"),
            source: "review.txt".to_string(),
            score: 1.5,
        }])
    }

    async fn answer(&self, _history: &[Message], question: &str) -> Result<String, AgentError> {
        if let Ok(mut q) = self.questions.lock() {
            q.push(question.to_string());
        }
        Ok(format!("evidence for {question}"))
    }
}

/// Policy checker with a fixed verdict.
#[derive(Default)]
pub struct StubPolicy {
    /// 1-based `judge` call that fails.
    pub fail_on: Option<usize>,
    calls: AtomicUsize,
}

impl StubPolicy {
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyChecker for StubPolicy {
    async fn judge(&self, _text: &str) -> Result<String, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return Err(AgentError::PolicyCheck {
                message: "moderation service down".to_string(),
            });
        }
        Ok("No restricted topics.".to_string())
    }
}
