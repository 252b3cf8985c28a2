//! The rescheduling rule, kept free of I/O.

use thiserror::Error;

use crate::models::event::CompletionEvent;
use crate::models::questionnaire::Questionnaire;
use crate::models::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Schedule another attempt at `at`.
    Reschedule { at: Timestamp },
    /// The participant's series for this questionnaire is finished.
    SeriesComplete,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("next attempt for questionnaire {questionnaire_id} overflows the calendar")]
pub struct ScheduleOverflow {
    pub questionnaire_id: String,
}

/// Decides what follows a completion.
///
/// An unbounded questionnaire (no `max_attempts`) always reschedules, even
/// when the event reports zero remaining completions.
pub fn decide_next_step(
    event: &CompletionEvent,
    questionnaire: &Questionnaire,
) -> Result<NextStep, ScheduleOverflow> {
    if event.remaining_completions > 0 || questionnaire.is_unbounded() {
        let at = next_attempt_at(event.completed_at, questionnaire.hours_between_attempts)
            .ok_or_else(|| ScheduleOverflow {
                questionnaire_id: questionnaire.id.clone(),
            })?;
        Ok(NextStep::Reschedule { at })
    } else {
        Ok(NextStep::SeriesComplete)
    }
}

pub fn next_attempt_at(completed_at: Timestamp, hours_between_attempts: i32) -> Option<Timestamp> {
    completed_at.checked_add_hours(i64::from(hours_between_attempts))
}
