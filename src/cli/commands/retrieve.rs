//! Retrieve and context commands.

use anyhow::Result;
use console::style;

use super::{open_index, print_json, retriever};
use crate::cli::args::ScopeArgs;
use crate::config::Settings;

pub async fn run_retrieve(
    settings: &Settings,
    query: &str,
    module: Option<&str>,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let retriever = retriever(settings, open_index(settings)?)?;
    let results = retriever.retrieve(query, module, k).await?;

    if json {
        return print_json(&results);
    }
    if results.is_empty() {
        eprintln!("No results found.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "\n{}. {} (distance: {:.3})",
            i + 1,
            style(&result.id).bold(),
            result.distance
        );
        let labels: Vec<&str> = [
            result.metadata.chapter.as_deref(),
            result.metadata.section.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !labels.is_empty() {
            println!("   Context: {}", labels.join(" > "));
        }
        println!("   Module: {}", result.metadata.module_id);
        println!("   Preview: {}", preview(&result.content, 200));
    }
    Ok(())
}

pub async fn run_context(
    settings: &Settings,
    query: &str,
    scope: &ScopeArgs,
    k: Option<usize>,
) -> Result<()> {
    let retriever = retriever(settings, open_index(settings)?)?;
    let context = retriever.build_context(query, &scope.to_scope(), k).await?;

    if context.is_empty() {
        eprintln!("No grounding context for this query.");
    } else {
        println!("{context}");
    }
    Ok(())
}

fn preview(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &flat[..end]),
        None => flat,
    }
}
