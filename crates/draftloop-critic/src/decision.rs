use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Lowest score an evaluation may report
pub const MIN_QUALITY_SCORE: f64 = 0.0;
/// Highest score an evaluation may report
pub const MAX_QUALITY_SCORE: f64 = 100.0;

/// The evaluator's binary verdict on a draft
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    /// Draft needs another revision round
    #[default]
    Revise,
    /// Draft is finalized, stop the loop
    Pass,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Revise => "REVISE",
            Decision::Pass => "PASS",
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Decision::Pass)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = MalformedCritique;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REVISE" => Ok(Decision::Revise),
            "PASS" => Ok(Decision::Pass),
            _ => Err(MalformedCritique::UnknownDecision(s.to_string())),
        }
    }
}

/// A critique that failed validation
#[derive(Error, Debug)]
pub enum MalformedCritique {
    #[error("Unknown decision '{0}' (expected REVISE or PASS)")]
    UnknownDecision(String),

    #[error("Quality score {0} is outside [0, 100]")]
    ScoreOutOfRange(f64),

    #[error("Critique does not match schema: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Critique exactly as the structured-completion capability returned it,
/// before any validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueVerdict {
    pub decision: String,
    pub quality_score: f64,
    pub critique_summary: String,
    pub specific_feedback: Vec<String>,
}

impl CritiqueVerdict {
    /// Decode a raw capability payload
    pub fn from_value(value: serde_json::Value) -> Result<Self, MalformedCritique> {
        Ok(serde_json::from_value(value)?)
    }

    /// Validate the verdict and tag it with the round it belongs to.
    ///
    /// Scores are never clamped: anything outside `[0, 100]`, including NaN,
    /// is rejected.
    pub fn validate(self, revision_count: u32) -> Result<CritiqueEntry, MalformedCritique> {
        let decision: Decision = self.decision.parse()?;

        if !self.quality_score.is_finite()
            || !(MIN_QUALITY_SCORE..=MAX_QUALITY_SCORE).contains(&self.quality_score)
        {
            return Err(MalformedCritique::ScoreOutOfRange(self.quality_score));
        }

        debug!(
            %decision,
            quality_score = self.quality_score,
            feedback_points = self.specific_feedback.len(),
            "Validated critique"
        );

        Ok(CritiqueEntry {
            decision,
            quality_score: self.quality_score,
            critique_summary: self.critique_summary,
            specific_feedback: self.specific_feedback,
            revision_count,
        })
    }
}

/// One validated critique round. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueEntry {
    pub decision: Decision,
    pub quality_score: f64,
    pub critique_summary: String,
    #[serde(default)]
    pub specific_feedback: Vec<String>,
    pub revision_count: u32,
}

impl CritiqueEntry {
    /// Convert a decoded mapping into a typed entry when it is well formed
    pub fn from_map(map: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let entry: CritiqueEntry =
            serde_json::from_value(serde_json::Value::Object(map.clone())).ok()?;
        let in_range = entry.quality_score.is_finite()
            && (MIN_QUALITY_SCORE..=MAX_QUALITY_SCORE).contains(&entry.quality_score);
        in_range.then_some(entry)
    }

    /// The entry as a JSON object map
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Get a short description of the critique for logging
    pub fn short_description(&self) -> String {
        if self.specific_feedback.is_empty() {
            format!("{} ({:.1}/100)", self.decision, self.quality_score)
        } else {
            format!(
                "{} ({:.1}/100, {} feedback points)",
                self.decision,
                self.quality_score,
                self.specific_feedback.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verdict(decision: &str, score: f64) -> CritiqueVerdict {
        CritiqueVerdict {
            decision: decision.to_string(),
            quality_score: score,
            critique_summary: "Solid structure, weak conclusion".to_string(),
            specific_feedback: vec!["Tighten the conclusion".to_string()],
        }
    }

    #[test]
    fn test_validate_pass() {
        let entry = verdict("PASS", 92.0).validate(2).unwrap();
        assert_eq!(entry.decision, Decision::Pass);
        assert_eq!(entry.revision_count, 2);
        assert_eq!(entry.specific_feedback.len(), 1);
    }

    #[test]
    fn test_validate_decision_is_case_sensitive() {
        for raw in ["revise", "pass", " Revise ", "PASS "] {
            let result = verdict(raw, 40.0).validate(1);
            assert!(
                matches!(result, Err(MalformedCritique::UnknownDecision(ref d)) if d == raw),
                "decision {:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_validate_rejects_accept() {
        let result = verdict("ACCEPT", 90.0).validate(1);
        assert!(matches!(result, Err(MalformedCritique::UnknownDecision(d)) if d == "ACCEPT"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_scores() {
        for score in [-0.1, 100.5, f64::NAN, f64::INFINITY] {
            let result = verdict("REVISE", score).validate(1);
            assert!(
                matches!(result, Err(MalformedCritique::ScoreOutOfRange(_))),
                "score {} should be rejected",
                score
            );
        }
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(verdict("REVISE", 0.0).validate(1).is_ok());
        assert!(verdict("PASS", 100.0).validate(1).is_ok());
    }

    #[test]
    fn test_verdict_from_value_missing_field() {
        let result = CritiqueVerdict::from_value(json!({"decision": "PASS"}));
        assert!(matches!(result, Err(MalformedCritique::Schema(_))));
    }

    #[test]
    fn test_verdict_from_value_requires_feedback_field() {
        let result = CritiqueVerdict::from_value(json!({
            "decision": "PASS",
            "quality_score": 90,
            "critique_summary": "Reads well"
        }));
        assert!(matches!(result, Err(MalformedCritique::Schema(_))));
    }

    #[test]
    fn test_verdict_from_value_accepts_empty_feedback() {
        let verdict = CritiqueVerdict::from_value(json!({
            "decision": "PASS",
            "quality_score": 90,
            "critique_summary": "Reads well",
            "specific_feedback": []
        }))
        .unwrap();
        assert!(verdict.specific_feedback.is_empty());
    }

    #[test]
    fn test_entry_serializes_uppercase_decision() {
        let entry = verdict("PASS", 88.0).validate(3).unwrap();
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["decision"], "PASS");
        assert_eq!(value["revision_count"], 3);
    }

    #[test]
    fn test_from_map_rejects_out_of_range() {
        let map = json!({
            "decision": "REVISE",
            "quality_score": 140.0,
            "critique_summary": "",
            "specific_feedback": [],
            "revision_count": 1
        });
        assert!(CritiqueEntry::from_map(map.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_short_description() {
        let entry = verdict("REVISE", 40.0).validate(1).unwrap();
        assert_eq!(entry.short_description(), "REVISE (40.0/100, 1 feedback points)");
    }
}
