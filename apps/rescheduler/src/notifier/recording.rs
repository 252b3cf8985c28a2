//! Notifier that keeps every notification in memory, for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::notifier::{NotifyError, Notifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    NewSchedule {
        schedule_id: String,
        participant_id: String,
    },
    SeriesCompleted {
        participant_id: String,
    },
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails, but is still recorded as attempted.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        if self.failing {
            return Err(NotifyError::Send("queue unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_new_schedule(
        &self,
        schedule_id: &str,
        participant_id: &str,
    ) -> Result<(), NotifyError> {
        self.record(Notification::NewSchedule {
            schedule_id: schedule_id.to_string(),
            participant_id: participant_id.to_string(),
        })
    }

    async fn notify_series_completed(&self, participant_id: &str) -> Result<(), NotifyError> {
        self.record(Notification::SeriesCompleted {
            participant_id: participant_id.to_string(),
        })
    }
}
