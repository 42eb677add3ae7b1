//! Multi-judge response validation.
//!
//! Every configured judge model votes `safe`, `unsafe` or (on failure)
//! `error`. The answer passes only on a strict majority of `safe` votes,
//! so ties and errors count against it.

mod gate;
pub mod rubric;
mod validator;

pub use gate::{AnswerGate, DEFAULT_REFUSAL, GatedAnswer};
pub use validator::{DEFAULT_VALIDATORS, ResponseValidator};

use serde::Serialize;
use std::fmt;

/// One judge's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteResult {
    Safe,
    Unsafe,
    Error,
}

impl VoteResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for VoteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vote {
    pub model: String,
    pub result: VoteResult,
}

/// Reduced outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub is_safe: bool,
    /// One vote per judge, in configuration order.
    pub votes: Vec<Vote>,
    pub explanation: String,
    pub errors: Vec<String>,
    /// Set when the validator itself failed and no real vote happened.
    pub degraded: bool,
}

impl Verdict {
    /// Reduce votes with the strict-majority rule `safe * 2 > total`.
    pub fn from_votes(votes: Vec<Vote>, errors: Vec<String>) -> Self {
        let safe = votes
            .iter()
            .filter(|vote| vote.result == VoteResult::Safe)
            .count();
        let is_safe = safe * 2 > votes.len();

        let listed = votes
            .iter()
            .map(|vote| format!("{}={}", vote.model, vote.result))
            .collect::<Vec<_>>()
            .join(", ");
        let mut explanation = format!("Validators: {listed}");
        if !errors.is_empty() {
            explanation.push_str(&format!(". Errors: {}", errors.join("; ")));
        }

        Self {
            is_safe,
            votes,
            explanation,
            errors,
            degraded: false,
        }
    }

    /// Verdict recorded when validation could not run.
    pub fn degraded(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            is_safe: false,
            votes: Vec::new(),
            explanation: format!("Validation failed: {error}"),
            errors: vec![error],
            degraded: true,
        }
    }

    pub fn safe_count(&self) -> usize {
        self.votes
            .iter()
            .filter(|vote| vote.result == VoteResult::Safe)
            .count()
    }
}
