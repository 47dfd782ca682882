//! Draft / execute-tools / revise cycle.
//!
//! An explicit state enum, a pure transition function and a driver loop.
//! Loop depth is not counted separately: it is read off the history as the
//! trailing run of `ai`/`tool` messages, so a resumed history that already
//! ends in such messages counts towards the bound.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::executor::ToolExecutor;
use super::message::{Message, trailing_turns};
use super::provider::LlmProvider;
use super::responder::ValidatingResponder;
use crate::error::AgentError;

/// Node of the cycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// Produce the first structured answer.
    Draft,
    /// Run the latest answer's search queries.
    ExecuteTools,
    /// Produce a revised structured answer.
    Revise,
    /// Done; the last history message is the cycle result.
    Terminal,
}

impl CycleState {
    /// Returns the node name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::ExecuteTools => "execute_tools",
            Self::Revise => "revise",
            Self::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the state following `state` given the history produced so far.
///
/// `Revise` leaves the loop once the trailing `ai`/`tool` run exceeds
/// `agent_iterations`.
#[must_use]
pub fn next_state(state: CycleState, history: &[Message], agent_iterations: usize) -> CycleState {
    match state {
        CycleState::Draft => CycleState::ExecuteTools,
        CycleState::ExecuteTools => CycleState::Revise,
        CycleState::Revise if trailing_turns(history) > agent_iterations => CycleState::Terminal,
        CycleState::Revise => CycleState::ExecuteTools,
        CycleState::Terminal => CycleState::Terminal,
    }
}

/// Bounded reflexion cycle over a pair of responders.
#[derive(Debug, Clone)]
pub struct CycleGraph {
    drafter: ValidatingResponder,
    revisor: ValidatingResponder,
    agent_iterations: usize,
}

impl CycleGraph {
    /// Creates a graph from the draft and revise responders.
    #[must_use]
    pub const fn new(
        drafter: ValidatingResponder,
        revisor: ValidatingResponder,
        agent_iterations: usize,
    ) -> Self {
        Self {
            drafter,
            revisor,
            agent_iterations,
        }
    }

    /// Runs a fresh cycle from a seed `human` message.
    ///
    /// `on_message` sees every message the cycle appends, with the node that
    /// produced it.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on provider or retriever failure.
    #[allow(clippy::future_not_send)]
    pub async fn run<F>(
        &self,
        provider: &dyn LlmProvider,
        tools: &ToolExecutor<'_>,
        seed: Message,
        on_message: F,
    ) -> Result<Vec<Message>, AgentError>
    where
        F: FnMut(CycleState, &Message),
    {
        self.drive(provider, tools, CycleState::Draft, vec![seed], on_message)
            .await
    }

    /// Drives the graph from an arbitrary state and partial history until
    /// `Terminal`, returning the full history.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on provider or retriever failure; the partial
    /// history is dropped.
    #[allow(clippy::future_not_send)]
    pub async fn drive<F>(
        &self,
        provider: &dyn LlmProvider,
        tools: &ToolExecutor<'_>,
        mut state: CycleState,
        mut history: Vec<Message>,
        mut on_message: F,
    ) -> Result<Vec<Message>, AgentError>
    where
        F: FnMut(CycleState, &Message),
    {
        loop {
            match state {
                CycleState::Terminal => return Ok(history),
                CycleState::Draft | CycleState::Revise => {
                    let responder = if state == CycleState::Draft {
                        &self.drafter
                    } else {
                        &self.revisor
                    };
                    let message = responder.respond(provider, &history).await?;
                    on_message(state, &message);
                    history.push(message);
                }
                CycleState::ExecuteTools => {
                    let replies = match history.last() {
                        Some(last) => tools.execute(last).await?,
                        None => Vec::new(),
                    };
                    for reply in replies {
                        on_message(state, &reply);
                        history.push(reply);
                    }
                }
            }

            let next = next_state(state, &history, self.agent_iterations);
            debug!(
                from = %state,
                to = %next,
                trailing = trailing_turns(&history),
                "cycle transition"
            );
            state = next;
        }
    }
}
