//! Ingest, delete and count commands.

use anyhow::{Context, Result, anyhow};
use console::style;
use serde::Serialize;
use std::path::Path;

use super::{embedding_service, open_index, print_json};
use crate::config::Settings;
use crate::documents::{DocumentStatus, IngestionPipeline, StructuredChunker};

/// Ingest one text file into a module.
pub async fn run_ingest(
    settings: &Settings,
    file: &Path,
    module: &str,
    document: Option<&str>,
) -> Result<()> {
    settings
        .chunking
        .validate()
        .map_err(|e| anyhow!("Invalid [chunking] settings: {e}"))?;

    let document = match document {
        Some(id) => id.to_string(),
        None => file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Cannot derive a document id from {}", file.display()))?,
    };

    let pipeline = IngestionPipeline::new(
        Box::new(StructuredChunker::new(settings.chunking.clone())),
        embedding_service(settings)?,
        open_index(settings)?,
    );

    tracing::info!(target: "cli", "ingesting {} as {document}", file.display());
    let result = pipeline.ingest_file(file, module, &document).await;
    let status = DocumentStatus::after_ingest(&result);
    tracing::info!(target: "cli", "document {document} status: {status}");
    let count = result.with_context(|| format!("Failed to ingest {}", file.display()))?;

    println!(
        "{} {count} chunks from {} (module {module}, document {document}, status {status})",
        style("Ingested").green().bold(),
        file.display()
    );
    Ok(())
}

pub fn run_delete_document(settings: &Settings, document: &str) -> Result<()> {
    let removed = open_index(settings)?.delete_by_document(document)?;
    println!("Removed {removed} chunks for document {document}");
    Ok(())
}

pub fn run_delete_module(settings: &Settings, module: &str) -> Result<()> {
    let removed = open_index(settings)?.delete_by_module(module)?;
    println!("Removed {removed} chunks for module {module}");
    Ok(())
}

#[derive(Serialize)]
struct CountOutput<'a> {
    module: Option<&'a str>,
    document: Option<&'a str>,
    chunks: usize,
}

pub fn run_count(
    settings: &Settings,
    module: Option<&str>,
    document: Option<&str>,
    json: bool,
) -> Result<()> {
    let index = open_index(settings)?;
    let chunks = match document {
        Some(document) => index.count_by_document(document)?,
        None => index.count(module)?,
    };

    if json {
        return print_json(&CountOutput {
            module,
            document,
            chunks,
        });
    }

    let scope = match (module, document) {
        (_, Some(document)) => format!("document {document}"),
        (Some(module), None) => format!("module {module}"),
        (None, None) => "index".to_string(),
    };
    println!("{chunks} chunks in {scope}");
    Ok(())
}
