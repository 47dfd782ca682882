//! Outer iteration controller.
//!
//! Runs the cycle graph `iterations` times. After each cycle the final
//! answer is extracted, annotated for safety and literature relation, and
//! appended to the session table; its short name then joins the known
//! concepts that seed the next cycle.
//!
//! A model or retriever fault stops the session. Rows produced before the
//! fault are kept and returned in the [`SessionReport`].

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::annotate::{PolicyChecker, RelationAgent};
use super::config::AgentConfig;
use super::executor::ToolExecutor;
use super::graph::{CycleGraph, CycleState};
use super::message::{Message, human_message};
use super::prompt::{PromptSet, build_seed_prompt};
use super::provider::LlmProvider;
use super::responder::ValidatingResponder;
use super::retriever::Retriever;
use super::schema::{SchemaKind, salvage_record};
use crate::core::{HypothesisContext, HypothesisRow, HypothesisTable, KnownConcepts};
use crate::error::AgentError;

/// Progress notification emitted while a session runs.
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// An outer iteration is starting with this seed text.
    IterationStarted {
        /// 1-based iteration number.
        iteration: usize,
        /// Seed `human` message content.
        seed: &'a str,
    },
    /// The cycle graph appended a message.
    Message {
        /// 1-based iteration number.
        iteration: usize,
        /// Node that produced the message.
        state: CycleState,
        /// The appended message.
        message: &'a Message,
    },
    /// A row was appended to the table.
    RowAppended {
        /// 1-based iteration number.
        iteration: usize,
        /// The new row.
        row: &'a HypothesisRow,
    },
    /// The session stopped on a fault.
    Aborted {
        /// 1-based iteration that failed.
        iteration: usize,
        /// The fault.
        error: &'a AgentError,
    },
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStop {
    /// All iterations produced a row.
    Completed,
    /// A fault stopped the session during `iteration`.
    Aborted {
        /// 1-based iteration that failed.
        iteration: usize,
        /// Rendered fault.
        error: String,
    },
}

/// Everything a session produced.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Rows in generation order.
    pub table: HypothesisTable,
    /// Concatenated short names fed forward between iterations.
    pub known_concepts: KnownConcepts,
    /// How the session ended.
    pub stop: RunStop,
}

impl SessionReport {
    /// Returns `true` if every iteration completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stop == RunStop::Completed
    }
}

/// Drives hypothesis generation for one research context.
pub struct IterationController {
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<dyn Retriever>,
    policy: Arc<dyn PolicyChecker>,
    config: AgentConfig,
    prompts: PromptSet,
}

impl IterationController {
    /// Creates a controller with prompts loaded from
    /// [`AgentConfig::prompt_dir`], falling back to compiled-in defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        policy: Arc<dyn PolicyChecker>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, retriever, policy, config, prompts)
    }

    /// Creates a controller with an explicit prompt set.
    pub const fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        policy: Arc<dyn PolicyChecker>,
        config: AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        Self {
            provider,
            retriever,
            policy,
            config,
            prompts,
        }
    }

    /// Runs `config.iterations` outer iterations for `context`.
    ///
    /// Never fails: a fault is reported through [`SessionReport::stop`] and
    /// an [`RunEvent::Aborted`] event.
    #[allow(clippy::future_not_send)]
    pub async fn run<F>(&self, context: &HypothesisContext, mut on_event: F) -> SessionReport
    where
        F: FnMut(RunEvent<'_>),
    {
        let start = Instant::now();
        let graph = self.build_graph(context);
        let tools = ToolExecutor::new(self.retriever.as_ref());
        let mut table = HypothesisTable::new();
        let mut known_concepts = KnownConcepts::new();

        for iteration in 1..=self.config.iterations {
            match self
                .run_iteration(&graph, &tools, iteration, &known_concepts, &mut on_event)
                .await
            {
                Ok(row) => {
                    known_concepts.push(&row.short_name);
                    info!(
                        iteration,
                        short_name = %row.short_name,
                        rows = table.len() + 1,
                        "hypothesis appended"
                    );
                    table.push(row);
                    if let Some(row) = table.rows().last() {
                        on_event(RunEvent::RowAppended { iteration, row });
                    }
                }
                Err(e) => {
                    error!(iteration, error = %e, rows = table.len(), "iteration failed; stopping");
                    on_event(RunEvent::Aborted {
                        iteration,
                        error: &e,
                    });
                    return SessionReport {
                        table,
                        known_concepts,
                        stop: RunStop::Aborted {
                            iteration,
                            error: e.to_string(),
                        },
                    };
                }
            }
        }

        info!(
            rows = table.len(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "session complete"
        );
        SessionReport {
            table,
            known_concepts,
            stop: RunStop::Completed,
        }
    }

    fn build_graph(&self, context: &HypothesisContext) -> CycleGraph {
        let responder = |schema| {
            ValidatingResponder::new(schema, &self.config, self.prompts.clone(), context.clone())
        };
        CycleGraph::new(
            responder(SchemaKind::AnswerQuestion),
            responder(SchemaKind::ReviseAnswer),
            self.config.agent_iterations,
        )
    }

    #[allow(clippy::future_not_send)]
    async fn run_iteration<F>(
        &self,
        graph: &CycleGraph,
        tools: &ToolExecutor<'_>,
        iteration: usize,
        known_concepts: &KnownConcepts,
        on_event: &mut F,
    ) -> Result<HypothesisRow, AgentError>
    where
        F: FnMut(RunEvent<'_>),
    {
        let seed = build_seed_prompt(known_concepts.as_str());
        info!(iteration, known = known_concepts.as_str(), "starting iteration");
        on_event(RunEvent::IterationStarted {
            iteration,
            seed: &seed,
        });

        let history = graph
            .run(
                self.provider.as_ref(),
                tools,
                human_message(&seed),
                |state, message| {
                    on_event(RunEvent::Message {
                        iteration,
                        state,
                        message,
                    });
                },
            )
            .await?;

        let last = history.last().ok_or_else(|| AgentError::ResponseParse {
            message: "cycle produced no messages".to_string(),
            content: String::new(),
        })?;
        let (record, missing) = salvage_record(last)?;
        for field in &missing {
            warn!(iteration, field = %field.field, problem = %field.message, "final answer incomplete");
        }

        let safety = self.policy.judge(&record.answer).await?;
        let short_name = &record.reflection.short_name;
        let passages = self.retriever.search(short_name).await?;
        debug!(iteration, passages = passages.len(), "relating hypothesis to literature");
        let relation = RelationAgent::new(&self.prompts, &self.config.annotation_model, short_name)
            .relate(self.provider.as_ref(), &passages)
            .await?;

        Ok(HypothesisRow::new(
            record.answer,
            record.reflection,
            safety,
            relation,
        ))
    }
}

impl std::fmt::Debug for IterationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationController")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
