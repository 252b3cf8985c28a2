//! Completion workflow: turns one completion event into store writes and a
//! notification.
//!
//! Flow: concurrent lookups (questionnaire + pending schedule) → mark the
//! schedule completed → reschedule or close the series → record the result.
//!
//! Two dispatch modes exist for everything after the lookups:
//! - `Detach`: every write is spawned and forgotten; the response only says
//!   the lookups succeeded.
//! - `Await`: the schedule is completed first with a conditional update, then
//!   the remaining writes run in a `JoinSet` and their failures are reported.
//!
//! Notifications are spawned and never awaited in either mode; a slow queue
//! cannot hold the response open.

pub mod decision;
pub mod handlers;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::event::CompletionEvent;
use crate::models::questionnaire::Questionnaire;
use crate::models::result::QuestionnaireResult;
use crate::models::schedule::ScheduledQuestionnaire;
use crate::notifier::Notifier;
use crate::store::{QuestionnaireStore, ResultStore, ScheduleStore, StoreError};
use crate::workflow::decision::{decide_next_step, NextStep};

/// Stored as the result's answers until events carry real answers.
pub const PLACEHOLDER_ANSWERS: &str = r#"{"question":"answer"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Wait for every write and report failures.
    #[default]
    Await,
    /// Respond once the lookups succeed; writes run unobserved.
    Detach,
}

impl FromStr for CompletionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "await" => Ok(CompletionMode::Await),
            "detach" => Ok(CompletionMode::Detach),
            other => Err(format!(
                "unknown completion mode '{other}' (expected 'await' or 'detach')"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowOptions {
    pub mode: CompletionMode,
    /// Constrain both lookups to the event's study.
    pub scope_to_study: bool,
}

/// A sub-operation launched after the lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    MarkCompleted,
    CreateSchedule,
    CreateResult,
    /// A background task panicked or was cancelled.
    Task,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::MarkCompleted => "mark_completed",
            Step::CreateSchedule => "create_schedule",
            Step::CreateResult => "create_result",
            Step::Task => "task",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    pub step: Step,
    pub message: String,
}

/// What actually happened after the lookups. Empty in `Detach` mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionReport {
    pub next_step: Option<String>,
    pub new_schedule_id: Option<String>,
    pub failures: Vec<StepFailure>,
}

/// Status code plus a short text body, as returned to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub status: StatusCode,
    pub body: String,
    pub report: CompletionReport,
}

impl CompletionResponse {
    fn success(report: CompletionReport) -> Self {
        Self {
            status: StatusCode::OK,
            body: "Success".to_string(),
            report,
        }
    }

    fn lookup_failed() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "Internal server error".to_string(),
            report: CompletionReport::default(),
        }
    }

    fn already_completed(report: CompletionReport) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            body: "Schedule already completed".to_string(),
            report,
        }
    }

    fn partial_failure(report: CompletionReport) -> Self {
        let steps: Vec<String> = report.failures.iter().map(|f| f.step.to_string()).collect();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: format!("Partial failure: {}", steps.join(", ")),
            report,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }
}

pub struct CompletionWorkflow {
    questionnaires: Arc<dyn QuestionnaireStore>,
    schedules: Arc<dyn ScheduleStore>,
    results: Arc<dyn ResultStore>,
    notifier: Arc<dyn Notifier>,
    options: WorkflowOptions,
}

impl CompletionWorkflow {
    pub fn new(
        questionnaires: Arc<dyn QuestionnaireStore>,
        schedules: Arc<dyn ScheduleStore>,
        results: Arc<dyn ResultStore>,
        notifier: Arc<dyn Notifier>,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            questionnaires,
            schedules,
            results,
            notifier,
            options,
        }
    }

    /// Processes one completion event.
    ///
    /// A failed lookup returns 500 before any write is attempted.
    pub async fn handle_completion(&self, event: CompletionEvent) -> CompletionResponse {
        info!(
            "Processing completion {} (questionnaire {}, participant {}, remaining {})",
            event.id, event.questionnaire_id, event.user_id, event.remaining_completions
        );

        let (questionnaire, schedule) = match self.lookup(&event).await {
            Ok(found) => found,
            Err(e) => {
                error!("Completion {} aborted during lookup: {e}", event.id);
                return CompletionResponse::lookup_failed();
            }
        };

        let ctx = Arc::new(CompletionContext {
            event,
            questionnaire,
            schedule,
            schedules: Arc::clone(&self.schedules),
            results: Arc::clone(&self.results),
            notifier: Arc::clone(&self.notifier),
        });

        match self.options.mode {
            CompletionMode::Detach => {
                dispatch_detached(ctx);
                CompletionResponse::success(CompletionReport::default())
            }
            CompletionMode::Await => run_to_completion(ctx).await,
        }
    }

    /// Fetches the questionnaire and the pending schedule concurrently. The
    /// first error wins and the other lookup is dropped.
    async fn lookup(
        &self,
        event: &CompletionEvent,
    ) -> Result<(Questionnaire, ScheduledQuestionnaire), StoreError> {
        let study_id = self
            .options
            .scope_to_study
            .then_some(event.study_id.as_str());

        let questionnaire = async {
            match study_id {
                Some(study_id) => {
                    self.questionnaires
                        .get_questionnaire_in_study(&event.questionnaire_id, study_id)
                        .await
                }
                None => {
                    self.questionnaires
                        .get_questionnaire(&event.questionnaire_id)
                        .await
                }
            }
        };
        let schedule =
            self.schedules
                .get_pending_schedule(&event.questionnaire_id, &event.user_id, study_id);

        tokio::try_join!(questionnaire, schedule)
    }
}

/// Everything the post-lookup tasks need, shared between them.
struct CompletionContext {
    event: CompletionEvent,
    questionnaire: Questionnaire,
    schedule: ScheduledQuestionnaire,
    schedules: Arc<dyn ScheduleStore>,
    results: Arc<dyn ResultStore>,
    notifier: Arc<dyn Notifier>,
}

/// Outcome of the reschedule-or-finish branch.
struct BranchOutcome {
    next_step: &'static str,
    new_schedule_id: Option<String>,
    failures: Vec<StepFailure>,
}

enum TaskOutcome {
    Branch(BranchOutcome),
    Result(Result<(), StepFailure>),
}

fn dispatch_detached(ctx: Arc<CompletionContext>) {
    let mark = Arc::clone(&ctx);
    tokio::spawn(async move {
        let _ = mark_completed(&mark).await;
    });

    let branch = Arc::clone(&ctx);
    tokio::spawn(async move {
        apply_next_step(&branch).await;
    });

    tokio::spawn(async move {
        let _ = record_result(&ctx).await;
    });
}

async fn run_to_completion(ctx: Arc<CompletionContext>) -> CompletionResponse {
    let mut report = CompletionReport::default();

    // Completing first means a racing completion for the same pair stops here
    // instead of scheduling a second follow-up.
    if let Err(e) = mark_completed(&ctx).await {
        let conflict = matches!(e, StoreError::Conflict { .. });
        report.failures.push(StepFailure {
            step: Step::MarkCompleted,
            message: e.to_string(),
        });
        return if conflict {
            CompletionResponse::already_completed(report)
        } else {
            CompletionResponse::partial_failure(report)
        };
    }

    let mut tasks = JoinSet::new();

    let branch = Arc::clone(&ctx);
    tasks.spawn(async move { TaskOutcome::Branch(apply_next_step(&branch).await) });

    let result = Arc::clone(&ctx);
    tasks.spawn(async move { TaskOutcome::Result(record_result(&result).await) });

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(TaskOutcome::Branch(outcome)) => {
                report.next_step = Some(outcome.next_step.to_string());
                report.new_schedule_id = outcome.new_schedule_id;
                report.failures.extend(outcome.failures);
            }
            Ok(TaskOutcome::Result(Ok(()))) => {}
            Ok(TaskOutcome::Result(Err(failure))) => report.failures.push(failure),
            Err(e) => {
                error!("Completion {} background task failed: {e}", ctx.event.id);
                report.failures.push(StepFailure {
                    step: Step::Task,
                    message: e.to_string(),
                });
            }
        }
    }

    if !report.failures.is_empty() {
        CompletionResponse::partial_failure(report)
    } else {
        CompletionResponse::success(report)
    }
}

async fn mark_completed(ctx: &CompletionContext) -> Result<(), StoreError> {
    let schedule_id = &ctx.schedule.id;
    match ctx.schedules.mark_schedule_completed(schedule_id).await {
        Ok(()) => {
            info!("Completion {}: schedule {schedule_id} completed", ctx.event.id);
            Ok(())
        }
        Err(e) => {
            error!(
                "Completion {}: failed to complete schedule {schedule_id}: {e}",
                ctx.event.id
            );
            Err(e)
        }
    }
}

/// Sends a notification on its own task. Failures are logged only.
fn spawn_notification(ctx: &Arc<CompletionContext>, new_schedule_id: Option<String>) {
    let notifier = Arc::clone(&ctx.notifier);
    let event_id = ctx.event.id.clone();
    let participant_id = ctx.event.user_id.clone();
    tokio::spawn(async move {
        let sent = match &new_schedule_id {
            Some(schedule_id) => {
                notifier
                    .notify_new_schedule(schedule_id, &participant_id)
                    .await
            }
            None => notifier.notify_series_completed(&participant_id).await,
        };
        if let Err(e) = sent {
            warn!("Completion {event_id}: notification failed: {e}");
        }
    });
}

async fn apply_next_step(ctx: &Arc<CompletionContext>) -> BranchOutcome {
    let event = &ctx.event;
    let participant_id = &event.user_id;

    let next = match decide_next_step(event, &ctx.questionnaire) {
        Ok(next) => next,
        Err(e) => {
            error!("Completion {}: {e}", event.id);
            return BranchOutcome {
                next_step: "reschedule",
                new_schedule_id: None,
                failures: vec![StepFailure {
                    step: Step::CreateSchedule,
                    message: e.to_string(),
                }],
            };
        }
    };

    match next {
        NextStep::Reschedule { at } => {
            let schedule = ScheduledQuestionnaire::pending(
                Uuid::new_v4().to_string(),
                ctx.questionnaire.id.clone(),
                participant_id.clone(),
                at,
            );
            let mut outcome = BranchOutcome {
                next_step: "reschedule",
                new_schedule_id: None,
                failures: Vec::new(),
            };

            if let Err(e) = ctx.schedules.create_schedule(&schedule).await {
                error!(
                    "Completion {}: failed to create schedule {}: {e}",
                    event.id, schedule.id
                );
                outcome.failures.push(StepFailure {
                    step: Step::CreateSchedule,
                    message: e.to_string(),
                });
                return outcome;
            }
            info!(
                "Completion {}: scheduled {} for participant {participant_id} at {at}",
                event.id, schedule.id
            );
            outcome.new_schedule_id = Some(schedule.id.clone());
            spawn_notification(ctx, Some(schedule.id));
            outcome
        }
        NextStep::SeriesComplete => {
            info!(
                "Completion {}: participant {participant_id} finished questionnaire {}",
                event.id, ctx.questionnaire.id
            );
            spawn_notification(ctx, None);
            BranchOutcome {
                next_step: "series_complete",
                new_schedule_id: None,
                failures: Vec::new(),
            }
        }
    }
}

async fn record_result(ctx: &CompletionContext) -> Result<(), StepFailure> {
    let result = QuestionnaireResult {
        id: Uuid::new_v4().to_string(),
        answers: PLACEHOLDER_ANSWERS.to_string(),
        questionnaire_id: ctx.questionnaire.id.clone(),
        participant_id: ctx.event.user_id.clone(),
        questionnaire_schedule_id: ctx.schedule.id.clone(),
        completed_at: ctx.event.completed_at,
    };

    ctx.results.create_result(&result).await.map_err(|e| {
        error!(
            "Completion {}: failed to record result {}: {e}",
            ctx.event.id, result.id
        );
        StepFailure {
            step: Step::CreateResult,
            message: e.to_string(),
        }
    })
}
