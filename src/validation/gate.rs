use super::Verdict;
use crate::error::ValidationError;

/// Shown to the student instead of an answer that failed validation.
pub const DEFAULT_REFUSAL: &str = "I'm sorry, but I can't share that answer right now. \
Could you try rephrasing your question, or ask your teacher for help?";

/// The answer to release plus the verdict that decided it.
#[derive(Debug, Clone, PartialEq)]
pub struct GatedAnswer {
    pub answer: String,
    pub verdict: Verdict,
    /// True when the refusal replaced the original answer.
    pub refused: bool,
}

/// Applies a validation outcome to a candidate answer.
///
/// Unsafe verdicts swap in the refusal message. A validator that failed
/// outright does not block the answer: it is released unchanged with a
/// degraded verdict.
#[derive(Debug, Clone)]
pub struct AnswerGate {
    refusal_message: String,
}

impl Default for AnswerGate {
    fn default() -> Self {
        Self::new(DEFAULT_REFUSAL)
    }
}

impl AnswerGate {
    pub fn new(refusal_message: impl Into<String>) -> Self {
        Self {
            refusal_message: refusal_message.into(),
        }
    }

    pub fn refusal_message(&self) -> &str {
        &self.refusal_message
    }

    pub fn apply(&self, answer: &str, outcome: Result<Verdict, ValidationError>) -> GatedAnswer {
        match outcome {
            Ok(verdict) if verdict.is_safe => GatedAnswer {
                answer: answer.to_string(),
                verdict,
                refused: false,
            },
            Ok(verdict) => {
                tracing::info!(target: "validation", "answer withheld: {}", verdict.explanation);
                GatedAnswer {
                    answer: self.refusal_message.clone(),
                    verdict,
                    refused: true,
                }
            }
            Err(e) => {
                tracing::warn!(target: "validation", "validation failed, releasing answer: {e}");
                GatedAnswer {
                    answer: answer.to_string(),
                    verdict: Verdict::degraded(e.to_string()),
                    refused: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{Vote, VoteResult};

    fn verdict(results: &[VoteResult]) -> Verdict {
        let votes = results
            .iter()
            .map(|r| Vote {
                model: "m".to_string(),
                result: *r,
            })
            .collect();
        Verdict::from_votes(votes, Vec::new())
    }

    #[test]
    fn test_safe_answer_passes() {
        let gated = AnswerGate::default().apply(
            "6",
            Ok(verdict(&[VoteResult::Safe, VoteResult::Safe])),
        );
        assert_eq!(gated.answer, "6");
        assert!(!gated.refused);
    }

    #[test]
    fn test_unsafe_answer_is_refused() {
        let gate = AnswerGate::new("Let's try again.");
        let gated = gate.apply("6", Ok(verdict(&[VoteResult::Safe, VoteResult::Unsafe])));
        assert_eq!(gated.answer, "Let's try again.");
        assert!(gated.refused);
        assert!(!gated.verdict.is_safe);
    }

    #[test]
    fn test_validator_failure_releases_answer() {
        let gated = AnswerGate::default().apply("6", Err(ValidationError::NoValidators));
        assert_eq!(gated.answer, "6");
        assert!(gated.verdict.degraded);
        assert!(!gated.verdict.is_safe);
        assert_eq!(gated.verdict.errors, vec!["No validator models configured".to_string()]);
    }
}
