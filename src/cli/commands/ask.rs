//! Validate and ask commands.

use anyhow::Result;
use console::style;

use super::{open_index, print_json, retriever, tutor_client, validator};
use crate::cli::args::ScopeArgs;
use crate::config::Settings;
use crate::tutor::Tutor;
use crate::validation::{Verdict, VoteResult};

pub async fn run_validate(
    settings: &Settings,
    question: &str,
    answer: &str,
    validators: &[String],
    json: bool,
) -> Result<()> {
    let (validator, _) = validator(settings)?;
    let judges = if validators.is_empty() {
        validator.validators().to_vec()
    } else {
        validators.to_vec()
    };

    let verdict = validator.validate_with(question, answer, &judges).await?;

    if json {
        return print_json(&verdict);
    }
    print_verdict(&verdict);
    Ok(())
}

pub async fn run_ask(
    settings: &Settings,
    question: &str,
    scope: &ScopeArgs,
    no_validate: bool,
    json: bool,
) -> Result<()> {
    let retriever = retriever(settings, open_index(settings)?)?;
    let mut tutor = Tutor::new(retriever, tutor_client(settings)?, settings.tutor.clone());
    if settings.validation.enabled && !no_validate {
        let (validator, gate) = validator(settings)?;
        tutor = tutor.with_validator(validator, gate);
    }

    let reply = tutor.ask(question, &scope.to_scope()).await?;

    if json {
        return print_json(&reply);
    }

    println!("{}", reply.answer);
    if let Some(verdict) = &reply.verdict {
        eprintln!();
        print_verdict(verdict);
    }
    Ok(())
}

fn print_verdict(verdict: &Verdict) {
    let label = if verdict.is_safe {
        style("SAFE").green().bold()
    } else {
        style("UNSAFE").red().bold()
    };
    eprintln!("Verdict: {label}");

    for vote in &verdict.votes {
        let result = match vote.result {
            VoteResult::Safe => style(vote.result.as_str()).green(),
            VoteResult::Unsafe => style(vote.result.as_str()).red(),
            VoteResult::Error => style(vote.result.as_str()).yellow(),
        };
        eprintln!("  {}: {result}", vote.model);
    }
    for error in &verdict.errors {
        eprintln!("  {} {error}", style("error:").yellow());
    }
    if verdict.degraded {
        eprintln!("  (validation did not run; answer released unchecked)");
    }
}
