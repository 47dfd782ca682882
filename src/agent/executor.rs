//! Tool execution stage: runs the search queries a structured answer asked for.
//!
//! Every tool call on the latest `ai` message gets exactly one `tool` reply
//! correlated by id, even when its arguments are unusable, so the history
//! stays well-formed for the next model call.

use serde::Deserialize;
use tracing::debug;

use super::message::{Message, tool_message};
use super::retriever::Retriever;
use super::schema::SchemaKind;
use super::tool::{ToolCall, ToolResult};
use crate::error::AgentError;

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Executes `search_queries` through a [`Retriever`].
pub struct ToolExecutor<'a> {
    retriever: &'a dyn Retriever,
}

impl<'a> ToolExecutor<'a> {
    /// Creates an executor backed by the given retriever.
    #[must_use]
    pub fn new(retriever: &'a dyn Retriever) -> Self {
        Self { retriever }
    }

    /// Runs every tool call of `message` and returns one `tool` message each.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the retriever fails; the remaining calls
    /// are not executed.
    pub async fn execute(&self, message: &Message) -> Result<Vec<Message>, AgentError> {
        let mut replies = Vec::with_capacity(message.tool_calls.len());
        for call in &message.tool_calls {
            let result = self.execute_call(call).await?;
            replies.push(tool_message(&result.tool_call_id, &result.content));
        }
        Ok(replies)
    }

    /// Runs the queries of one tool call, sequentially and in order.
    ///
    /// Malformed calls produce an error result rather than a failure.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the retriever fails.
    pub async fn execute_call(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        let queries = match parse_queries(call) {
            Ok(queries) => queries,
            Err(message) => {
                debug!(tool = %call.name, id = %call.id, %message, "rejected tool call");
                return Ok(ToolResult {
                    tool_call_id: call.id.clone(),
                    content: message,
                    is_error: true,
                });
            }
        };

        let mut results = Vec::with_capacity(queries.len());
        for query in &queries {
            debug!(tool = %call.name, query = %query, "running search query");
            results.push(self.retriever.answer(&[], query).await?);
        }

        let content = serde_json::to_string(&results).map_err(|e| AgentError::ResponseParse {
            message: format!("failed to encode tool results: {e}"),
            content: String::new(),
        })?;
        Ok(ToolResult {
            tool_call_id: call.id.clone(),
            content,
            is_error: false,
        })
    }
}

fn parse_queries(call: &ToolCall) -> Result<Vec<String>, String> {
    #[derive(Deserialize)]
    struct Args {
        search_queries: Vec<String>,
    }

    if SchemaKind::from_name(&call.name).is_none() {
        return Err(format!("unknown tool: {}", call.name));
    }
    if call.arguments.len() > MAX_TOOL_ARGS_LEN {
        return Err(format!(
            "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
            call.arguments.len()
        ));
    }
    let args: Args =
        serde_json::from_str(&call.arguments).map_err(|e| format!("invalid arguments: {e}"))?;
    Ok(args.search_queries)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{Role, ai_message};
    use crate::agent::testing::{StubRetriever, draft_args};

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[tokio::test]
    async fn test_queries_run_in_order() {
        let retriever = StubRetriever::default();
        let executor = ToolExecutor::new(&retriever);
        let msg = ai_message(
            "",
            vec![call(
                "c1",
                "ReviseAnswer",
                r#"{"search_queries":["first","second","first"]}"#,
            )],
        );

        let replies = executor
            .execute(&msg)
            .await
            .unwrap_or_else(|e| panic!("execute failed: {e}"));
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].role, Role::Tool);
        assert_eq!(replies[0].tool_call_id.as_deref(), Some("c1"));

        let results: Vec<String> = serde_json::from_str(&replies[0].content)
            .unwrap_or_else(|e| panic!("not a JSON list: {e}"));
        assert_eq!(
            results,
            ["result for first", "result for second", "result for first"]
        );
        let questions = retriever.questions.lock().map(|q| q.clone()).unwrap_or_default();
        assert_eq!(questions, ["first", "second", "first"]);
    }

    #[tokio::test]
    async fn test_one_reply_per_call() {
        let retriever = StubRetriever::default();
        let executor = ToolExecutor::new(&retriever);
        let msg = ai_message(
            "",
            vec![
                call("a", "AnswerQuestion", &draft_args("X").to_string()),
                call("b", "AnswerQuestion", "{broken"),
                call("c", "retrieve_papers", "{}"),
            ],
        );
        let replies = executor
            .execute(&msg)
            .await
            .unwrap_or_else(|e| panic!("execute failed: {e}"));
        let ids: Vec<_> = replies.iter().filter_map(|m| m.tool_call_id.as_deref()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(replies[1].content.starts_with("invalid arguments"));
        assert!(replies[2].content.contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_no_tool_calls_no_replies() {
        let retriever = StubRetriever::default();
        let executor = ToolExecutor::new(&retriever);
        let replies = executor
            .execute(&ai_message("prose only", Vec::new()))
            .await
            .unwrap_or_else(|e| panic!("execute failed: {e}"));
        assert!(replies.is_empty());
    }

    #[tokio::test]
    async fn test_retriever_error_propagates() {
        let retriever = StubRetriever {
            fail: true,
            ..StubRetriever::default()
        };
        let executor = ToolExecutor::new(&retriever);
        let msg = ai_message(
            "",
            vec![call("c1", "AnswerQuestion", r#"{"search_queries":["q"]}"#)],
        );
        let result = executor.execute(&msg).await;
        assert!(matches!(result, Err(AgentError::Retrieval { .. })));
    }

    #[test]
    fn test_oversized_arguments_rejected() {
        let huge = format!(r#"{{"search_queries":["{}"]}}"#, "x".repeat(MAX_TOOL_ARGS_LEN));
        let err = parse_queries(&call("c", "AnswerQuestion", &huge))
            .err()
            .unwrap_or_else(|| panic!("expected rejection"));
        assert!(err.contains("too large"));
    }
}
