use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the generate/critique/revise loop.
///
/// `round` is always the 1-based evaluation round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        run_id: String,
        prompt: String,
        max_revisions: u32,
    },
    SearchCompleted {
        query: String,
        results: usize,
    },
    SearchSkipped {
        reason: String,
    },
    GeneratorStarted {
        tone: String,
    },
    DraftGenerated {
        draft_chars: usize,
        note: String,
    },
    EvaluationStarted {
        round: u32,
    },
    EvaluationCompleted {
        round: u32,
        decision: String,
        quality_score: f64,
        summary: String,
    },
    /// Counter step finished; `round` is the updated revision count
    RevisionsCounted {
        round: u32,
        history_len: usize,
    },
    TargetScoreMet {
        round: u32,
        quality_score: f64,
        target: f64,
    },
    RevisionStarted {
        round: u32,
        feedback_points: usize,
    },
    RevisionCompleted {
        round: u32,
        draft_chars: usize,
    },
    RunPassed {
        rounds: u32,
        quality_score: f64,
        duration_secs: f64,
    },
    RevisionBudgetExhausted {
        rounds: u32,
        max_revisions: u32,
        quality_score: f64,
    },
    ErrorEncountered {
        round: u32,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

/// Logger for draftloop events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// A logger that writes nothing
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Compact,
            console: false,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    /// Stop echoing events to stderr (file output is unaffected)
    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn log(&self, event: &LogEvent) {
        // Log to file if configured (always JSON format for file)
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RunStarted {
                prompt,
                max_revisions,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "draftloop".bold().bright_white(),
                    " ".repeat(58) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Topic:".dimmed(),
                    Self::truncate_with_padding(prompt, 61, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Budget:".dimmed(),
                    Self::truncate_with_padding(&format!("{} rounds", max_revisions), 60, 68)
                        .dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::SearchCompleted { results, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "🔎".dimmed(),
                    format!("Search: {} related posts", results).dimmed()
                );
            }
            LogEvent::SearchSkipped { reason } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "⚠".bright_yellow(),
                    format!("Search skipped: {}", reason).dimmed()
                );
            }
            LogEvent::GeneratorStarted { tone } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    "GENERATOR".bright_cyan().bold(),
                    format!("({} tone)", tone).dimmed()
                );
            }
            LogEvent::DraftGenerated { draft_chars, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Draft ready ({} chars)",
                    "✓".bright_green(),
                    draft_chars
                );
                let _ = writeln!(stderr);
            }
            LogEvent::EvaluationStarted { round } => {
                let round_text = format!("─ Round {} ", round);
                let padding = "─".repeat(67usize.saturating_sub(round_text.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    round_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "EVALUATOR".bright_magenta().bold()
                );
            }
            LogEvent::EvaluationCompleted {
                decision,
                quality_score,
                summary,
                ..
            } => {
                let styled_decision = if decision == "PASS" {
                    format!("✓ Decision: {} ({:.1}/100)", decision, quality_score)
                        .bright_green()
                        .to_string()
                } else {
                    format!("→ Decision: {} ({:.1}/100)", decision, quality_score)
                        .bright_yellow()
                        .to_string()
                };
                let _ = writeln!(stderr, "    {}", styled_decision);
                if !summary.is_empty() {
                    let _ = writeln!(stderr, "    {} {}", "│".dimmed(), summary.dimmed());
                }
            }
            LogEvent::TargetScoreMet {
                quality_score,
                target,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Score {:.1} meets target {:.1} (decision still governs)",
                    "★".bright_yellow(),
                    quality_score,
                    target
                );
            }
            LogEvent::RevisionStarted {
                feedback_points, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    "REVISER".bright_cyan().bold(),
                    format!("({} feedback points)", feedback_points).dimmed()
                );
            }
            LogEvent::RevisionCompleted { draft_chars, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Revised ({} chars)",
                    "✓".bright_green(),
                    draft_chars
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::RunPassed { .. } => {
                // Final report is printed by the binary
            }
            LogEvent::RevisionBudgetExhausted {
                rounds,
                max_revisions,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Revision budget exhausted after {} of {} rounds",
                    "⚠".bright_yellow(),
                    rounds,
                    max_revisions
                );
            }
            LogEvent::ErrorEncountered { round, error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Error in round {}: {}",
                    "✗".bright_red(),
                    round,
                    error.bright_red()
                );
            }
            LogEvent::RevisionsCounted { .. } => {
                // Bookkeeping only
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::RunStarted {
                run_id,
                max_revisions,
                ..
            } => format!("[{}] run:start {} max={}", timestamp, run_id, max_revisions),
            LogEvent::SearchCompleted { results, .. } => {
                format!("[{}] search:done {}", timestamp, results)
            }
            LogEvent::SearchSkipped { reason } => {
                format!("[{}] search:skip {}", timestamp, reason)
            }
            LogEvent::GeneratorStarted { tone } => {
                format!("[{}] generate:start tone={}", timestamp, tone)
            }
            LogEvent::DraftGenerated { draft_chars, .. } => {
                format!("[{}] generate:done {}c", timestamp, draft_chars)
            }
            LogEvent::EvaluationStarted { round } => {
                format!("[{}] evaluate:start:{}", timestamp, round)
            }
            LogEvent::EvaluationCompleted {
                round,
                decision,
                quality_score,
                ..
            } => format!(
                "[{}] evaluate:done:{} {} {:.1}",
                timestamp, round, decision, quality_score
            ),
            LogEvent::RevisionsCounted { round, history_len } => {
                format!("[{}] count:{} history={}", timestamp, round, history_len)
            }
            LogEvent::TargetScoreMet {
                round,
                quality_score,
                target,
            } => format!(
                "[{}] target:{} {:.1}>={:.1}",
                timestamp, round, quality_score, target
            ),
            LogEvent::RevisionStarted {
                round,
                feedback_points,
            } => format!(
                "[{}] revise:start:{} feedback={}",
                timestamp, round, feedback_points
            ),
            LogEvent::RevisionCompleted { round, draft_chars } => {
                format!("[{}] revise:done:{} {}c", timestamp, round, draft_chars)
            }
            LogEvent::RunPassed {
                rounds,
                quality_score,
                duration_secs,
            } => format!(
                "[{}] run:pass:{} {:.1} {:.1}s",
                timestamp, rounds, quality_score, duration_secs
            ),
            LogEvent::RevisionBudgetExhausted {
                rounds,
                max_revisions,
                ..
            } => format!("[{}] run:limit:{}/{}", timestamp, rounds, max_revisions),
            LogEvent::ErrorEncountered { round, error } => {
                format!("[{}] error:{}:{}", timestamp, round, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let single_line = s.replace('\n', " ");
        let truncated = if single_line.chars().count() > max_len {
            let head: String = single_line.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", head)
        } else {
            single_line
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1); // +1 for trailing │
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
