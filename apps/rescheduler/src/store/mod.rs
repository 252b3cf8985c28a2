//! Entity store: one capability trait per entity kind.
//!
//! Every operation touches a single row and is independently fallible; there
//! are no multi-row transactions. `PgStore` is the production provider and
//! `MemoryStore` backs the tests.
//!
//! The workflow holds each capability as an `Arc<dyn ...>`, so providers can
//! be swapped without touching it.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::participant::Participant;
use crate::models::questionnaire::Questionnaire;
use crate::models::result::QuestionnaireResult;
use crate::models::schedule::ScheduledQuestionnaire;

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A lookup that expects exactly one row found none.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A conditional update on `status = 'pending'` matched no row, so the
    /// schedule was already completed (or never existed).
    #[error("scheduled questionnaire {schedule_id} is no longer pending")]
    Conflict { schedule_id: String },

    /// The row exists but breaks a data-model invariant.
    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            key: key.into(),
        }
    }
}

#[async_trait]
pub trait QuestionnaireStore: Send + Sync {
    async fn get_questionnaire(&self, questionnaire_id: &str) -> Result<Questionnaire, StoreError>;

    /// Same as `get_questionnaire`, additionally requiring the questionnaire
    /// to belong to `study_id`.
    async fn get_questionnaire_in_study(
        &self,
        questionnaire_id: &str,
        study_id: &str,
    ) -> Result<Questionnaire, StoreError>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Returns the single pending schedule for the pair. If the
    /// one-pending-per-pair invariant is broken, which row comes back is
    /// unspecified.
    async fn get_pending_schedule(
        &self,
        questionnaire_id: &str,
        participant_id: &str,
        study_id: Option<&str>,
    ) -> Result<ScheduledQuestionnaire, StoreError>;

    /// Transitions `pending -> completed`. Fails with `Conflict` when the
    /// schedule is not pending any more.
    async fn mark_schedule_completed(&self, schedule_id: &str) -> Result<(), StoreError>;

    /// Inserts a new schedule. The stored status is always `pending`.
    async fn create_schedule(&self, schedule: &ScheduledQuestionnaire) -> Result<(), StoreError>;

    async fn list_schedules(
        &self,
        participant_id: &str,
        questionnaire_id: Option<&str>,
    ) -> Result<Vec<ScheduledQuestionnaire>, StoreError>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn create_result(&self, result: &QuestionnaireResult) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ParticipantStore: Send + Sync {
    async fn get_participant(&self, participant_id: &str) -> Result<Participant, StoreError>;
}
