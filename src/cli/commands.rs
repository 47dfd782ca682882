//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::{
    AgentConfig, CorpusRetriever, IterationController, LlmProvider, PromptSet, RunEvent,
    SafetyAgent, create_provider,
};
use crate::cli::output::{OutputFormat, format_passages, format_report};
use crate::cli::parser::{Cli, Commands, CorpusCommands, GenerateArgs, PromptCommands};
use crate::corpus::{CorpusStore, ingest_path};
use crate::error::{CommandError, Result};

/// Characters of message content echoed into the event log.
const EVENT_PREVIEW_LEN: usize = 200;

/// Executes a CLI command and returns the text to print.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let corpus_path = cli.corpus_path();

    match &cli.command {
        Commands::Generate(args) => cmd_generate(&corpus_path, args, format),
        Commands::Corpus(sub) => execute_corpus(sub, &corpus_path, format),
        Commands::Prompts(PromptCommands::Init { dir }) => {
            cmd_init_prompts(dir.as_deref(), format)
        }
    }
}

/// Dispatches corpus subcommands.
fn execute_corpus(sub: &CorpusCommands, corpus_path: &Path, format: OutputFormat) -> Result<String> {
    match sub {
        CorpusCommands::Ingest { path } => cmd_ingest(corpus_path, path, format),
        CorpusCommands::Search { query, top_k } => cmd_search(corpus_path, query, *top_k, format),
        CorpusCommands::Status => cmd_status(corpus_path, format),
    }
}

/// Opens the corpus and ensures it's initialized.
fn open_corpus(corpus_path: &Path) -> Result<CorpusStore> {
    let store = CorpusStore::open(corpus_path)?;
    store.ensure_initialized()?;
    Ok(store)
}

// ==================== Command Implementations ====================

fn cmd_generate(corpus_path: &Path, args: &GenerateArgs, format: OutputFormat) -> Result<String> {
    let store = open_corpus(corpus_path)?;

    // Build agent configuration from env + CLI overrides
    let mut builder = AgentConfig::builder();
    if let Some(n) = args.agent_iterations {
        builder = builder.agent_iterations(n);
    }
    if let Some(n) = args.iterations {
        builder = builder.iterations(n);
    }
    if let Some(model) = &args.model {
        builder = builder.model(model);
    }
    if let Some(model) = &args.annotation_model {
        builder = builder.annotation_model(model);
    }
    if let Some(k) = args.top_k {
        builder = builder.search_top_k(k);
    }
    if let Some(dir) = &args.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder
        .from_env()
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("Agent configuration error: {e}")))?;

    let provider: Arc<dyn LlmProvider> = Arc::from(
        create_provider(&config)
            .map_err(|e| CommandError::ExecutionFailed(format!("Provider creation failed: {e}")))?,
    );
    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let retriever = Arc::new(CorpusRetriever::new(
        store,
        Arc::clone(&provider),
        &config,
        prompts.clone(),
    ));
    let policy = Arc::new(SafetyAgent::new(
        Arc::clone(&provider),
        &config.annotation_model,
        &prompts,
    ));
    let controller = IterationController::with_prompts(provider, retriever, policy, config, prompts);
    let context = args.context();

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")))?;
    let report = rt.block_on(controller.run(&context, log_event));

    if let Some(path) = &args.output {
        report.table.write_csv_path(path).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to write {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), rows = report.table.len(), "table written");
    }

    Ok(format_report(&report, format))
}

/// Surfaces every session event in the log.
fn log_event(event: RunEvent<'_>) {
    match event {
        RunEvent::IterationStarted { iteration, seed } => {
            debug!(iteration, seed, "seed");
        }
        RunEvent::Message {
            iteration,
            state,
            message,
        } => {
            let body = message
                .first_tool_call()
                .map_or(message.content.as_str(), |call| call.arguments.as_str());
            info!(
                iteration,
                node = %state,
                role = ?message.role,
                content = %truncate(body, EVENT_PREVIEW_LEN),
                "message"
            );
        }
        RunEvent::RowAppended { iteration, row } => {
            info!(iteration, short_name = %row.short_name, "row");
        }
        RunEvent::Aborted { iteration, error } => {
            info!(iteration, %error, "aborted");
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn cmd_ingest(corpus_path: &Path, source: &Path, format: OutputFormat) -> Result<String> {
    // Create parent directory if needed
    if let Some(parent) = corpus_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to create directory: {e}"))
        })?;
    }

    let mut store = CorpusStore::open(corpus_path)?;
    store.init()?;
    let report = ingest_path(&mut store, source)?;
    let total = store.count()?;

    match format {
        OutputFormat::Text => Ok(format!(
            "Ingested {} passage(s) from {} file(s) into {} ({} skipped, {total} total)\n",
            report.passages,
            report.files,
            corpus_path.display(),
            report.skipped,
        )),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "corpus": corpus_path.to_string_lossy(),
            "files": report.files,
            "passages": report.passages,
            "skipped": report.skipped,
            "total": total,
        }))),
    }
}

fn cmd_search(corpus_path: &Path, query: &str, top_k: usize, format: OutputFormat) -> Result<String> {
    let store = open_corpus(corpus_path)?;
    let passages = store.search(query, top_k)?;
    Ok(format_passages(query, &passages, format))
}

fn cmd_status(corpus_path: &Path, format: OutputFormat) -> Result<String> {
    let (initialized, passages) = if corpus_path.exists() {
        let store = CorpusStore::open(corpus_path)?;
        if store.is_initialized()? {
            (true, store.count()?)
        } else {
            (false, 0)
        }
    } else {
        (false, 0)
    };

    match format {
        OutputFormat::Text => {
            if initialized {
                Ok(format!(
                    "Corpus: {}\nPassages: {passages}\n",
                    corpus_path.display()
                ))
            } else {
                Ok(format!(
                    "Corpus: {} (not initialized; run `hypogen-rs corpus ingest <path>`)\n",
                    corpus_path.display()
                ))
            }
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "corpus": corpus_path.to_string_lossy(),
            "initialized": initialized,
            "passages": passages,
        }))),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    output.push_str("  ");
                    output.push_str(
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown"),
                    );
                    output.push('\n');
                }
                output.push_str("\nEdit these files to customize the prompts.\n");
                Ok(output)
            }
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
            "count": written.len()
        }))),
    }
}
