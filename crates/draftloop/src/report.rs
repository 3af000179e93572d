//! Terminal report printed when a run ends.

use colored::Colorize;
use serde_json::Value;

use draftloop_core::RunOutcome;
use draftloop_critic::{parse_entry, CritiqueHistoryItem, CritiqueMap, RAW_KEY};

pub const STATUS_PASSED: &str = "PASSED";
pub const STATUS_REVISED: &str = "REVISED";
pub const STATUS_STOPPED: &str = "STOPPED (MAX REVISIONS)";

/// Status label for one round of history. The last REVISE round of a run
/// that hit the budget is reported as stopped.
pub fn round_status(critique: &CritiqueMap, is_last: bool, budget_exhausted: bool) -> &'static str {
    let passed = critique.get("decision").and_then(Value::as_str) == Some("PASS");
    if passed {
        STATUS_PASSED
    } else if is_last && budget_exhausted {
        STATUS_STOPPED
    } else {
        STATUS_REVISED
    }
}

/// One block per round, decoded through the tolerant history codec
pub fn render_history(history: &[CritiqueHistoryItem], budget_exhausted: bool) -> String {
    let mut out = format!("Critique History ({} Iterations)\n", history.len());

    for (i, item) in history.iter().enumerate() {
        let critique = parse_entry(item);
        let status = round_status(&critique, i + 1 == history.len(), budget_exhausted);
        let score = match critique.get("quality_score") {
            Some(Value::Number(n)) => n.to_string(),
            _ => "N/A".to_string(),
        };

        out.push_str(&format!(
            "\nIteration {}: Status: {} | Score: {}/100\n",
            i + 1,
            status,
            score
        ));
        match critique.get("critique_summary").and_then(Value::as_str) {
            Some(summary) => out.push_str(&format!("Summary: {}\n", summary)),
            None => {
                if let Some(raw) = critique.get(RAW_KEY).and_then(Value::as_str) {
                    out.push_str(&format!("Unparsed critique: {}\n", raw));
                }
            }
        }

        let feedback: Vec<&str> = critique
            .get("specific_feedback")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if !feedback.is_empty() {
            out.push_str("Specific Feedback:\n");
            for point in feedback {
                out.push_str(&format!("  - {}\n", point));
            }
        }
    }
    out
}

pub fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Passed {
            rounds,
            quality_score,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== PASSED ===".green().bold());
            eprintln!(
                "The draft passed the quality check after {} round(s) with a final score of {:.1}/100.",
                rounds, quality_score
            );
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        RunOutcome::BudgetExhausted {
            max_revisions,
            quality_score,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== INCOMPLETE ===".yellow().bold());
            eprintln!(
                "Draft finalized after reaching the maximum of {} revision(s). Final score: {:.1}/100.",
                max_revisions, quality_score
            );
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        RunOutcome::Failed {
            rounds,
            error,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== FAILED ===".red().bold());
            eprintln!("Error after {} round(s): {}", rounds, error);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }

    if let Some(draft) = outcome.draft() {
        eprintln!();
        eprintln!("{}", "Final Blog Post".bold());
        println!("{}", draft);
    }

    if !outcome.history().is_empty() {
        let budget_exhausted = matches!(outcome, RunOutcome::BudgetExhausted { .. });
        eprintln!();
        eprint!("{}", render_history(outcome.history(), budget_exhausted));
    }
}
