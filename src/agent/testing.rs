//! Scripted collaborators shared by the agent unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::annotate::PolicyChecker;
use super::message::{ChatRequest, ChatResponse, Message, TokenUsage};
use super::provider::LlmProvider;
use super::retriever::Retriever;
use super::tool::ToolCall;
use crate::corpus::Passage;
use crate::error::AgentError;

/// Replays queued responses in order and records every request.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ChatResponse, AgentError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, response: Result<ChatResponse, AgentError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| {
                Err(AgentError::ApiRequest {
                    message: "script exhausted".to_string(),
                    status: None,
                })
            })
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
        "answer": format!("Answer about {short_name}"),
        "reflection": {
            "missing": "missing",
            "superfluous": "superfluous",
            "not_novel": "not novel",
            "short_name": short_name,
            "novelty_score": "6",
            "references": "PMID 1",
            "flag": "inputs look real"
        },
        "search_queries": [format!("{short_name} evidence")]
    })
}

pub fn revise_args(short_name: &str) -> Value {
    let mut args = draft_args(short_name);
    args["citations"] = json!(["[1] PMID 1"]);
    args
}

/// Retriever returning canned text and recording its inputs.
#[derive(Default)]
pub struct StubRetriever {
    pub searches: Mutex<Vec<String>>,
    pub questions: Mutex<Vec<String>>,
    pub fail: bool,
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
                message: "index offline".to_string(),
            });
        }
        Ok(vec![Passage {
            id: 1,
            title: "Paper".to_string(),
            text: format!("about {query}"),
            source: String::new(),
            score: 1.0,
        }])
    }

    async fn answer(&self, _history: &[Message], question: &str) -> Result<String, AgentError> {
        if let Ok(mut q) = self.questions.lock() {
            q.push(question.to_string());
        }
        if self.fail {
            return Err(AgentError::Retrieval {
                query: question.to_string(),
                message: "index offline".to_string(),
            });
        }
        Ok(format!("result for {question}"))
    }
}

/// Policy checker with a fixed verdict, optionally failing on one call.
#[derive(Default)]
pub struct StubPolicy {
    fail_on: Option<usize>,
    calls: AtomicUsize,
}

impl StubPolicy {
    /// Fails the `n`th (1-based) `judge` call.
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PolicyChecker for StubPolicy {
    async fn judge(&self, _text: &str) -> Result<String, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return Err(AgentError::PolicyCheck {
                message: "policy endpoint unavailable".to_string(),
            });
        }
        Ok("No restricted topics.".to_string())
    }
}
