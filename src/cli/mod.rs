//! CLI module: argument parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ScopeArgs};

use anyhow::{Result, anyhow};

use crate::config::Settings;
use crate::logging;

/// Load settings, set up logging and run the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { force } = cli.command {
        logging::init();
        return commands::init::run_init(force);
    }

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    logging::init_with_config(&settings.logging);
    tracing::debug!(target: "cli", "index at {}", settings.resolved_index_path().display());

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Ingest {
            file,
            module,
            document,
        } => commands::index::run_ingest(&settings, &file, &module, document.as_deref()).await,
        Commands::DeleteDocument { document } => {
            commands::index::run_delete_document(&settings, &document)
        }
        Commands::DeleteModule { module } => commands::index::run_delete_module(&settings, &module),
        Commands::Count {
            module,
            document,
            json,
        } => commands::index::run_count(&settings, module.as_deref(), document.as_deref(), json),
        Commands::Retrieve {
            query,
            module,
            k,
            json,
        } => commands::retrieve::run_retrieve(&settings, &query, module.as_deref(), k, json).await,
        Commands::Context { query, scope, k } => {
            commands::retrieve::run_context(&settings, &query, &scope, k).await
        }
        Commands::Validate {
            question,
            answer,
            validators,
            json,
        } => commands::ask::run_validate(&settings, &question, &answer, &validators, json).await,
        Commands::Ask {
            question,
            scope,
            no_validate,
            json,
        } => commands::ask::run_ask(&settings, &question, &scope, no_validate, json).await,
    }
}
