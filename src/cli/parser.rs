//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::HypothesisContext;

/// Default corpus database path, relative to the current directory.
pub const DEFAULT_CORPUS_PATH: &str = ".hypogen/corpus.db";

/// hypogen-rs: Reflexion-style research hypothesis generator.
///
/// Drives an LLM through bounded draft, search and revise cycles over a
/// local literature corpus and tabulates the resulting hypotheses.
#[derive(Parser, Debug)]
#[command(name = "hypogen-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the literature corpus database.
    ///
    /// Defaults to `.hypogen/corpus.db` in the current directory.
    #[arg(short, long, env = "HYPOGEN_CORPUS", global = true)]
    pub corpus: Option<PathBuf>,

    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the corpus path, falling back to [`DEFAULT_CORPUS_PATH`].
    #[must_use]
    pub fn corpus_path(&self) -> PathBuf {
        self.corpus
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS_PATH))
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate hypotheses for a research context.
    ///
    /// Each iteration runs a draft, search and revise cycle, annotates the
    /// result and feeds its short name forward so later hypotheses differ.
    #[command(after_help = r#"Examples:
  hypogen-rs generate                                   # Default BRCA1/BRCA2 context
  hypogen-rs generate --genes "ATR, CHK1" --iterations 3
  hypogen-rs generate --output hypotheses.csv
  hypogen-rs --format json generate | jq '.table[].short_name'
"#)]
    Generate(GenerateArgs),

    /// Literature corpus operations (ingest, search, status).
    #[command(subcommand)]
    Corpus(CorpusCommands),

    /// Prompt template operations.
    #[command(subcommand)]
    Prompts(PromptCommands),
}

/// Arguments for `generate`.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Genes of interest.
    #[arg(long, default_value = "BRCA1, BRCA2")]
    pub genes: String,

    /// Disease under study.
    #[arg(long, default_value = "triple negative breast cancer")]
    pub disease: String,

    /// Variable the model predicts.
    #[arg(
        long,
        default_value = "homologous recombination-proficient vs homologous recombination-deficient"
    )]
    pub target_variable: String,

    /// Kind of hypothesis requested.
    #[arg(long, default_value = "synthetic lethality interaction")]
    pub hypothesis_type: String,

    /// Hypotheses already known, to steer away from.
    #[arg(long, default_value = "")]
    pub known_hypotheses: String,

    /// Revise/search round trips per cycle.
    #[arg(short, long, env = "HYPOGEN_AGENT_ITERATIONS")]
    pub agent_iterations: Option<usize>,

    /// Number of hypotheses to generate.
    #[arg(short = 'n', long, env = "HYPOGEN_ITERATIONS")]
    pub iterations: Option<usize>,

    /// Model for drafting and revising.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Model for the annotation and retrieval calls.
    #[arg(long)]
    pub annotation_model: Option<String>,

    /// Passages retrieved per search.
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Directory containing prompt template files.
    #[arg(long, env = "HYPOGEN_PROMPT_DIR")]
    pub prompt_dir: Option<PathBuf>,

    /// Write the table as CSV to this path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl GenerateArgs {
    /// Returns the research context these arguments describe.
    #[must_use]
    pub fn context(&self) -> HypothesisContext {
        HypothesisContext {
            genes: self.genes.clone(),
            disease: self.disease.clone(),
            target_variable: self.target_variable.clone(),
            hypothesis_type: self.hypothesis_type.clone(),
            known_hypotheses: self.known_hypotheses.clone(),
        }
    }
}

/// Corpus subcommands.
#[derive(Subcommand, Debug)]
pub enum CorpusCommands {
    /// Ingest a file or directory into the corpus.
    ///
    /// `.txt` and `.md` files become one passage each; `.jsonl` files yield
    /// one passage per line with `title` and `text` fields.
    #[command(after_help = r#"Examples:
  hypogen-rs corpus ingest abstracts.jsonl
  hypogen-rs corpus ingest ./papers/
  hypogen-rs --corpus lit.db corpus ingest notes.md
"#)]
    Ingest {
        /// File or directory to ingest.
        path: PathBuf,
    },

    /// Search the corpus with BM25 ranking.
    Search {
        /// Search query text.
        query: String,

        /// Maximum number of results.
        #[arg(short = 'k', long, default_value = "4")]
        top_k: usize,
    },

    /// Show corpus status.
    Status,
}

/// Prompt template subcommands.
#[derive(Subcommand, Debug)]
pub enum PromptCommands {
    /// Write the default prompt templates for editing.
    ///
    /// Existing files are left untouched.
    Init {
        /// Target directory (defaults to `~/.config/hypogen-rs/prompts`).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}
