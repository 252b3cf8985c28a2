//! Outbound notifications: one plain-text message per call.
//!
//! Notifications are best-effort: callers log failures and move on.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
pub mod recording;
pub mod sqs;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to send notification: {0}")]
    Send(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new_schedule(
        &self,
        schedule_id: &str,
        participant_id: &str,
    ) -> Result<(), NotifyError>;

    async fn notify_series_completed(&self, participant_id: &str) -> Result<(), NotifyError>;
}

pub fn new_schedule_message(schedule_id: &str, participant_id: &str) -> String {
    format!("New schedule created with ID: {schedule_id} for participant with ID: {participant_id}")
}

pub fn series_completed_message(participant_id: &str) -> String {
    format!("User {participant_id} has completed all scheduled questionnaires.")
}
