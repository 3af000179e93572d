use std::sync::Arc;
use tracing::{debug, info, warn};

use draftloop_agent::{StructuredCompletion, TextCompletion};
use draftloop_critic::{latest_feedback, DraftEvaluator, DEFAULT_TONE};
use draftloop_logging::{LogEvent, Logger};

use crate::outcome::RunOutcome;
use crate::router::{route, Route, TARGET_SCORE};
use crate::steps::{count_revisions, next_round, DraftGenerator, DraftReviser, DRAFT_CREATED_NOTE};
use crate::{LoopError, RunContext, RunStatus};

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Generating,
    Evaluating,
    Routing,
    Revising,
    /// Terminal: evaluator returned PASS
    Passed,
    /// Terminal: round budget spent without a PASS
    BudgetExhausted,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Passed | Phase::BudgetExhausted)
    }
}

/// Orchestrates the generate/critique/revise loop
pub struct LoopRunner<'a> {
    writer: &'a dyn TextCompletion,
    critic: &'a dyn StructuredCompletion,
    tone: String,
    logger: Arc<Logger>,
}

impl<'a> LoopRunner<'a> {
    pub fn new(
        writer: &'a dyn TextCompletion,
        critic: &'a dyn StructuredCompletion,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            writer,
            critic,
            tone: DEFAULT_TONE.to_string(),
            logger,
        }
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    /// Run the loop until PASS, budget exhaustion or a failure.
    ///
    /// Capability and validation failures end the run as
    /// [`RunOutcome::Failed`]; only an empty prompt is returned as `Err`,
    /// before anything is called.
    pub async fn run(&self, mut ctx: RunContext) -> Result<RunOutcome, LoopError> {
        if ctx.state.user_prompt().trim().is_empty() {
            return Err(LoopError::EmptyPrompt);
        }

        ctx.status = RunStatus::Running;
        self.logger.log(&LogEvent::RunStarted {
            run_id: ctx.run_id.to_string(),
            prompt: ctx.state.user_prompt().to_string(),
            max_revisions: ctx.budget.get(),
        });

        let mut phase = Phase::Generating;
        loop {
            match self.step(phase, &mut ctx).await {
                Ok(next) if next.is_terminal() => return Ok(self.finish(ctx, next)),
                Ok(next) => {
                    debug!(from = ?phase, to = ?next, "Phase transition");
                    phase = next;
                }
                Err(e) => {
                    let round = next_round(&ctx.state);
                    warn!(error = %e, ?phase, round, "Run aborted");
                    self.logger.log(&LogEvent::ErrorEncountered {
                        round,
                        error: e.to_string(),
                    });
                    ctx.status = RunStatus::Finished;
                    let duration = ctx.total_duration();
                    return Ok(RunOutcome::failed(ctx.state, e.to_string(), duration));
                }
            }
        }
    }

    /// Execute one controller state and return the next
    async fn step(&self, phase: Phase, ctx: &mut RunContext) -> Result<Phase, LoopError> {
        match phase {
            Phase::Generating => {
                let generator = DraftGenerator::new(self.writer).with_tone(self.tone.as_str());
                self.logger.log(&LogEvent::GeneratorStarted {
                    tone: generator.tone().to_string(),
                });
                generator.generate(ctx).await?;
                let note = ctx
                    .notes
                    .last()
                    .cloned()
                    .unwrap_or_else(|| DRAFT_CREATED_NOTE.to_string());
                self.logger.log(&LogEvent::DraftGenerated {
                    draft_chars: ctx.state.draft_content.chars().count(),
                    note,
                });
                Ok(Phase::Evaluating)
            }
            Phase::Evaluating => {
                let round = next_round(&ctx.state);
                self.logger.log(&LogEvent::EvaluationStarted { round });

                let entry = DraftEvaluator::new(self.critic)
                    .evaluate(&ctx.state.draft_content, round)
                    .await?;

                self.logger.log(&LogEvent::EvaluationCompleted {
                    round,
                    decision: entry.decision.to_string(),
                    quality_score: entry.quality_score,
                    summary: entry.critique_summary.clone(),
                });
                debug!(round, critique = %entry.short_description(), "Recording critique");
                ctx.state.record_critique(entry);

                let counted = count_revisions(&mut ctx.state);
                self.logger.log(&LogEvent::RevisionsCounted {
                    round: counted,
                    history_len: ctx.state.critique_history().len(),
                });
                Ok(Phase::Routing)
            }
            Phase::Routing => {
                let score = ctx.state.quality_score;
                if score >= TARGET_SCORE {
                    info!(score, target = TARGET_SCORE, "Target score met");
                    self.logger.log(&LogEvent::TargetScoreMet {
                        round: ctx.state.revision_count,
                        quality_score: score,
                        target: TARGET_SCORE,
                    });
                }

                let next = route(&ctx.state, ctx.budget);
                info!(
                    round = ctx.state.revision_count,
                    decision = %ctx.state.decision,
                    route = next.reason(),
                    "Routing"
                );
                Ok(match next {
                    Route::Passed => Phase::Passed,
                    Route::BudgetExhausted => Phase::BudgetExhausted,
                    Route::Revise => Phase::Revising,
                })
            }
            Phase::Revising => {
                let round = ctx.state.revision_count;
                self.logger.log(&LogEvent::RevisionStarted {
                    round,
                    feedback_points: latest_feedback(ctx.state.critique_history()).len(),
                });
                DraftReviser::new(self.writer).revise(&mut ctx.state).await?;
                self.logger.log(&LogEvent::RevisionCompleted {
                    round,
                    draft_chars: ctx.state.draft_content.chars().count(),
                });
                Ok(Phase::Evaluating)
            }
            Phase::Passed | Phase::BudgetExhausted => Ok(phase),
        }
    }

    fn finish(&self, mut ctx: RunContext, terminal: Phase) -> RunOutcome {
        ctx.status = RunStatus::Finished;
        let duration = ctx.total_duration();
        debug!(
            run_id = %ctx.run_id,
            status = ?ctx.status,
            notes = ?ctx.notes,
            started_at = %ctx.started_at,
            "Run finished"
        );

        if terminal == Phase::BudgetExhausted {
            self.logger.log(&LogEvent::RevisionBudgetExhausted {
                rounds: ctx.state.revision_count,
                max_revisions: ctx.budget.get(),
                quality_score: ctx.state.quality_score,
            });
            return RunOutcome::budget_exhausted(ctx.state, ctx.budget.get(), duration);
        }

        self.logger.log(&LogEvent::RunPassed {
            rounds: ctx.state.revision_count,
            quality_score: ctx.state.quality_score,
            duration_secs: duration.as_secs_f64(),
        });
        RunOutcome::passed(ctx.state, duration)
    }
}
