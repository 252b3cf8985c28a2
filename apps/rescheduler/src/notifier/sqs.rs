use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use tracing::debug;

use crate::notifier::{new_schedule_message, series_completed_message, NotifyError, Notifier};

/// Publishes notifications to a single SQS queue.
#[derive(Clone)]
pub struct SqsNotifier {
    client: SqsClient,
    queue_url: String,
    delay_seconds: i32,
}

impl SqsNotifier {
    pub fn new(client: SqsClient, queue_url: String, delay_seconds: i32) -> Self {
        Self {
            client,
            queue_url,
            delay_seconds,
        }
    }

    async fn send(&self, body: String) -> Result<(), NotifyError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .delay_seconds(self.delay_seconds)
            .send()
            .await
            .map_err(|e| NotifyError::Send(format!("SQS send_message failed: {e}")))?;

        debug!(
            "Queued notification {} on {}",
            output.message_id().unwrap_or("<unknown>"),
            self.queue_url
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for SqsNotifier {
    async fn notify_new_schedule(
        &self,
        schedule_id: &str,
        participant_id: &str,
    ) -> Result<(), NotifyError> {
        self.send(new_schedule_message(schedule_id, participant_id))
            .await
    }

    async fn notify_series_completed(&self, participant_id: &str) -> Result<(), NotifyError> {
        self.send(series_completed_message(participant_id)).await
    }
}
