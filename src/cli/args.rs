//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Textbook-grounded math tutor
#[derive(Parser, Debug)]
#[command(
    name = "teacherspet",
    version = env!("CARGO_PKG_VERSION"),
    about = "Textbook-grounded math tutor",
    long_about = "Ingest textbook chapters into a local vector index, build module-scoped \
                  grounding context, and gate tutor answers behind a multi-model safety vote.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ teacherspet init\n  $ teacherspet ingest ratios.txt --module ratios --document ch1\n  $ teacherspet retrieve \"what is a unit rate\" --module ratios\n  $ teacherspet ask \"what is a unit rate\" --module ratios --module-name \"Ratios and Rates\""
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .teacherspet directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .teacherspet/settings.toml")]
    Config,

    /// Chunk, embed and index a text document
    #[command(
        about = "Ingest a UTF-8 text document into a module",
        after_help = "Examples:\n  teacherspet ingest chapter1.txt --module ratios --document ch1"
    )]
    Ingest {
        /// Path to the document text
        file: PathBuf,

        /// Module the document belongs to
        #[arg(long)]
        module: String,

        /// Document id (defaults to the file stem)
        #[arg(long)]
        document: Option<String>,
    },

    /// Remove a document's chunks from the index
    #[command(name = "delete-document", about = "Remove all chunks of a document")]
    DeleteDocument {
        /// Document id
        document: String,
    },

    /// Remove a module's chunks from the index
    #[command(name = "delete-module", about = "Remove all chunks of a module")]
    DeleteModule {
        /// Module id
        module: String,
    },

    /// Count indexed chunks
    #[command(about = "Count indexed chunks, optionally per module or document")]
    Count {
        #[arg(long)]
        module: Option<String>,

        #[arg(long, conflicts_with = "module")]
        document: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Nearest chunks for a query
    #[command(
        about = "Find the chunks closest to a query",
        after_help = "Examples:\n  teacherspet retrieve \"equivalent fractions\" --module fractions -k 3\n  teacherspet retrieve \"unit rate\" --json"
    )]
    Retrieve {
        query: String,

        /// Restrict to one module
        #[arg(long)]
        module: Option<String>,

        /// Number of chunks (defaults to retrieval.top_k)
        #[arg(short)]
        k: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the grounding context for a query
    #[command(about = "Render the tutor grounding context for a query")]
    Context {
        query: String,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Number of chunks (defaults to retrieval.top_k)
        #[arg(short)]
        k: Option<usize>,
    },

    /// Run the judge models on a question/answer pair
    #[command(
        about = "Vote on whether an answer is safe to show a student",
        after_help = "Examples:\n  teacherspet validate --question \"What is 3/4 of 8?\" --answer \"6\"\n  teacherspet validate -q \"2+2?\" -a \"4\" --validator gpt-4.1-mini --validator gpt-4o"
    )]
    Validate {
        #[arg(short, long)]
        question: String,

        #[arg(short, long)]
        answer: String,

        /// Judge model (repeatable; defaults to validation.validators)
        #[arg(long = "validator", value_name = "MODEL")]
        validators: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Ask the tutor a question
    #[command(about = "Answer a student question with grounding and validation")]
    Ask {
        question: String,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Skip answer validation
        #[arg(long)]
        no_validate: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Module scope flags shared by `context` and `ask`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Module id to search in
    #[arg(long)]
    pub module: Option<String>,

    /// Module name; enables the scope-restriction rules
    #[arg(long)]
    pub module_name: Option<String>,

    /// Short module description
    #[arg(long)]
    pub description: Option<String>,
}

impl ScopeArgs {
    pub fn to_scope(&self) -> crate::retrieval::ModuleScope {
        crate::retrieval::ModuleScope {
            module_id: self.module.clone(),
            name: self.module_name.clone(),
            description: self.description.clone(),
        }
    }
}
