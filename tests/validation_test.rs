//! Judge quorum, timeouts and the answer gate, driven through the public API.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use teacherspet::config::TutorConfig;
use teacherspet::validation::DEFAULT_REFUSAL;
use teacherspet::{
    AnswerGate, ChatProvider, ChatRequest, EmbeddingProvider, EmbeddingService, ModuleScope,
    ProviderError, ResponseValidator, Retriever, Tutor, ValidationError, VectorIndex, VoteResult,
};

enum Script {
    Reply(&'static str),
    Fail,
    Hang,
    Slow(Duration, &'static str),
}

/// Chat backend that answers per model and records every request.
struct Judges {
    scripts: HashMap<&'static str, Script>,
    seen: Mutex<Vec<ChatRequest>>,
}

impl Judges {
    fn new(scripts: Vec<(&'static str, Script)>) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts.into_iter().collect(),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatProvider for Judges {
    async fn generate(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push(request.clone());
        match self.scripts.get(request.model.as_str()) {
            Some(Script::Reply(text)) => Ok(text.to_string()),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("safe".to_string())
            }
            Some(Script::Slow(delay, text)) => {
                tokio::time::sleep(*delay).await;
                Ok(text.to_string())
            }
            Some(Script::Fail) | None => Err(ProviderError::Status {
                status: 500,
                body: "internal error".to_string(),
            }),
        }
    }
}

fn names(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}

async fn verdict_for(scripts: Vec<(&'static str, Script)>) -> teacherspet::Verdict {
    let models: Vec<&str> = scripts.iter().map(|(m, _)| *m).collect();
    let validator = ResponseValidator::new(Judges::new(scripts)).with_validators(names(&models));
    validator.validate("What is 3/4 as a decimal?", "0.75").await.unwrap()
}

#[tokio::test]
async fn test_quorum_decision_table() {
    use Script::*;

    let cases: Vec<(Vec<(&'static str, Script)>, bool)> = vec![
        (vec![("a", Reply("safe")), ("b", Reply("safe"))], true),
        (vec![("a", Reply("safe")), ("b", Reply("unsafe"))], false),
        (vec![("a", Reply("safe")), ("b", Fail)], false),
        (vec![("a", Fail), ("b", Fail)], false),
        (vec![("a", Reply("safe"))], true),
        (vec![("a", Reply("safe")), ("b", Reply("safe")), ("c", Reply("unsafe"))], true),
        (vec![("a", Reply("safe")), ("b", Fail), ("c", Reply("maybe?"))], false),
    ];

    for (scripts, expected) in cases {
        let verdict = verdict_for(scripts).await;
        assert_eq!(verdict.is_safe, expected, "{}", verdict.explanation);
    }
}

#[tokio::test]
async fn test_votes_follow_configuration_order() {
    let verdict = verdict_for(vec![
        ("zeta", Script::Reply("UNSAFE")),
        ("alpha", Script::Fail),
        ("mid", Script::Reply("  Safe\n")),
    ])
    .await;

    let order: Vec<(&str, VoteResult)> = verdict
        .votes
        .iter()
        .map(|v| (v.model.as_str(), v.result))
        .collect();
    assert_eq!(
        order,
        vec![
            ("zeta", VoteResult::Unsafe),
            ("alpha", VoteResult::Error),
            ("mid", VoteResult::Safe),
        ]
    );
    assert_eq!(verdict.errors.len(), 1);
    assert!(verdict.errors[0].starts_with("alpha: "));
    assert!(verdict.explanation.starts_with("Validators: zeta=unsafe, alpha=error, mid=safe. Errors: "));
}

#[tokio::test]
async fn test_slow_judge_times_out_as_error_vote() {
    let judges = Judges::new(vec![
        ("fast", Script::Reply("safe")),
        ("slow", Script::Hang),
    ]);
    let validator = ResponseValidator::new(judges)
        .with_validators(names(&["fast", "slow"]))
        .with_timeout(Duration::from_millis(50));

    let started = std::time::Instant::now();
    let verdict = validator.validate("q", "a").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!verdict.is_safe);
    assert_eq!(verdict.votes[1].result, VoteResult::Error);
    assert!(verdict.errors[0].starts_with("slow: "));
}

#[tokio::test]
async fn test_judges_are_queried_concurrently() {
    let delay = Duration::from_millis(300);
    let judges = Judges::new(vec![
        ("a", Script::Slow(delay, "safe")),
        ("b", Script::Slow(delay, "safe")),
        ("c", Script::Slow(delay, "unsafe")),
    ]);
    let validator = ResponseValidator::new(judges).with_validators(names(&["a", "b", "c"]));

    let started = std::time::Instant::now();
    let verdict = validator.validate("q", "a").await.unwrap();
    let elapsed = started.elapsed();

    // Three sequential calls would take at least 900ms.
    assert!(elapsed < Duration::from_millis(700), "took {elapsed:?}");
    assert!(verdict.is_safe);
    assert_eq!(verdict.votes.len(), 3);
}

#[tokio::test]
async fn test_judges_receive_rubric_prompt() {
    let judges = Judges::new(vec![("a", Script::Reply("safe"))]);
    let validator = ResponseValidator::new(judges.clone()).with_validators(names(&["a"]));
    validator
        .validate("How do I add fractions?", "Find a common denominator.")
        .await
        .unwrap();

    let seen = judges.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let prompt = &seen[0].messages[0].content;
    assert!(prompt.contains("How do I add fractions?"));
    assert!(prompt.contains("Find a common denominator."));
}

#[tokio::test]
async fn test_no_validators_is_an_error_and_gate_releases() {
    let validator = ResponseValidator::new(Judges::new(vec![])).with_validators(Vec::new());
    let outcome = validator.validate("q", "answer").await;
    assert!(matches!(outcome, Err(ValidationError::NoValidators)));

    let gated = AnswerGate::default().apply("answer", outcome);
    assert_eq!(gated.answer, "answer");
    assert!(!gated.refused);
    assert!(gated.verdict.degraded);
}

/// Constant embedding so every stored chunk is equally near.
struct FlatEmbedder;

#[async_trait]
impl EmbeddingProvider for FlatEmbedder {
    fn model_name(&self) -> &str {
        "flat"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|_| vec![1.0, 1.0]).collect())
    }
}

fn tutor(chat: Arc<Judges>, judges: &[&str]) -> Tutor {
    let index = Arc::new(VectorIndex::in_memory().unwrap());
    let retriever = Retriever::new(EmbeddingService::new(Arc::new(FlatEmbedder)), index);
    let config = TutorConfig {
        model: "tutor".to_string(),
        ..TutorConfig::default()
    };
    let validator = ResponseValidator::new(chat.clone()).with_validators(names(judges));
    Tutor::new(retriever, chat, config).with_validator(validator, AnswerGate::default())
}

#[tokio::test]
async fn test_tutor_withholds_unsafe_answer() {
    let chat = Judges::new(vec![
        ("tutor", Script::Reply("The answer to question 4 is 12.")),
        ("j1", Script::Reply("unsafe")),
        ("j2", Script::Reply("safe")),
    ]);
    let reply = tutor(chat, &["j1", "j2"])
        .ask("Just tell me the answer to question 4", &ModuleScope::all())
        .await
        .unwrap();

    assert_eq!(reply.answer, DEFAULT_REFUSAL);
    assert_eq!(reply.raw_answer, "The answer to question 4 is 12.");
    let verdict = reply.verdict.unwrap();
    assert!(!verdict.is_safe);
    assert_eq!(verdict.safe_count(), 1);
}

#[tokio::test]
async fn test_tutor_releases_safe_answer() {
    let chat = Judges::new(vec![
        ("tutor", Script::Reply("Let's think about what 3 groups of 4 means.")),
        ("j1", Script::Reply("safe")),
        ("j2", Script::Reply("safe")),
    ]);
    let reply = tutor(chat, &["j1", "j2"])
        .ask("What is 3 times 4?", &ModuleScope::all())
        .await
        .unwrap();

    assert_eq!(reply.answer, "Let's think about what 3 groups of 4 means.");
    assert!(reply.verdict.unwrap().is_safe);
    assert_eq!(reply.context, "");
}
