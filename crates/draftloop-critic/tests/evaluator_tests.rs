use std::sync::Mutex;

use async_trait::async_trait;
use draftloop_agent::{CapabilityError, ResponseSchema, StructuredCompletion};
use draftloop_critic::{Decision, DraftEvaluator, EvaluationError, MalformedCritique};
use serde_json::{json, Value};

/// Structured capability that replays one canned reply and records the call
struct CannedCritic {
    reply: Mutex<Option<Result<Value, CapabilityError>>>,
    seen: Mutex<Vec<(String, String)>>,
}

impl CannedCritic {
    fn new(reply: Result<Value, CapabilityError>) -> Self {
        Self {
            reply: Mutex::new(Some(reply)),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredCompletion for CannedCritic {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete_structured(
        &self,
        system_role: &str,
        instructions: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, CapabilityError> {
        assert_eq!(schema.name, "critique");
        self.seen
            .lock()
            .unwrap()
            .push((system_role.to_string(), instructions.to_string()));
        self.reply
            .lock()
            .unwrap()
            .take()
            .expect("evaluator called the capability more than once")
    }
}

fn critique(decision: &str, score: f64) -> Value {
    json!({
        "decision": decision,
        "quality_score": score,
        "critique_summary": "Readable but thin",
        "specific_feedback": ["Add a concrete example", "Shorten the intro"]
    })
}

#[tokio::test]
async fn test_evaluate_returns_tagged_entry() {
    let critic = CannedCritic::new(Ok(critique("REVISE", 62.5)));
    let entry = DraftEvaluator::new(&critic)
        .evaluate("# Draft\n\nSome text", 3)
        .await
        .unwrap();

    assert_eq!(entry.decision, Decision::Revise);
    assert_eq!(entry.quality_score, 62.5);
    assert_eq!(entry.revision_count, 3);
    assert_eq!(entry.specific_feedback.len(), 2);

    let calls = critic.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains("professional editor"));
    assert!(calls[0].1.contains("# Draft\n\nSome text"));
}

#[tokio::test]
async fn test_evaluate_rejects_out_of_range_score() {
    let critic = CannedCritic::new(Ok(critique("PASS", 120.0)));
    let err = DraftEvaluator::new(&critic)
        .evaluate("draft", 1)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EvaluationError::Malformed(MalformedCritique::ScoreOutOfRange(s)) if s == 120.0
    ));
}

#[tokio::test]
async fn test_evaluate_rejects_unknown_decision() {
    let critic = CannedCritic::new(Ok(critique("ACCEPT", 90.0)));
    let err = DraftEvaluator::new(&critic)
        .evaluate("draft", 1)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EvaluationError::Malformed(MalformedCritique::UnknownDecision(_))
    ));
}

#[tokio::test]
async fn test_evaluate_rejects_mistyped_payload() {
    let critic = CannedCritic::new(Ok(json!({
        "decision": "PASS",
        "quality_score": "ninety",
        "critique_summary": "",
        "specific_feedback": []
    })));
    let err = DraftEvaluator::new(&critic)
        .evaluate("draft", 1)
        .await
        .unwrap_err();

    assert!(matches!(err, EvaluationError::Malformed(MalformedCritique::Schema(_))));
}

#[tokio::test]
async fn test_evaluate_propagates_capability_error() {
    let critic = CannedCritic::new(Err(CapabilityError::Quota("daily limit".into())));
    let err = DraftEvaluator::new(&critic)
        .evaluate("draft", 1)
        .await
        .unwrap_err();

    assert!(matches!(err, EvaluationError::Capability(CapabilityError::Quota(_))));
}

#[tokio::test]
async fn test_evaluate_empty_draft_makes_no_call() {
    let critic = CannedCritic::new(Ok(critique("PASS", 99.0)));
    let err = DraftEvaluator::new(&critic)
        .evaluate("   ", 1)
        .await
        .unwrap_err();

    assert!(matches!(err, EvaluationError::EmptyDraft));
    assert!(critic.calls().is_empty());
}
