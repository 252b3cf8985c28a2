//! PostgreSQL provider for every store capability.
//!
//! Timestamps live in text columns using the fixed `YYYY-MM-DD HH:MM:SS`
//! layout, so they are bound as strings and decoded through `Timestamp`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::models::participant::Participant;
use crate::models::questionnaire::Questionnaire;
use crate::models::result::QuestionnaireResult;
use crate::models::schedule::{ScheduleStatus, ScheduledQuestionnaire};
use crate::store::{ParticipantStore, QuestionnaireStore, ResultStore, ScheduleStore, StoreError};

const QUESTIONNAIRE_COLUMNS: &str =
    "id, study_id, name, questions, max_attempts, hours_between_attempts";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn checked(questionnaire: Questionnaire) -> Result<Questionnaire, StoreError> {
    questionnaire
        .validate()
        .map_err(StoreError::InvalidRow)?;
    Ok(questionnaire)
}

#[async_trait]
impl QuestionnaireStore for PgStore {
    async fn get_questionnaire(&self, questionnaire_id: &str) -> Result<Questionnaire, StoreError> {
        let query = format!("SELECT {QUESTIONNAIRE_COLUMNS} FROM questionnaires WHERE id = $1");
        let row = sqlx::query_as::<_, Questionnaire>(&query)
            .bind(questionnaire_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("questionnaire", questionnaire_id))?;
        checked(row)
    }

    async fn get_questionnaire_in_study(
        &self,
        questionnaire_id: &str,
        study_id: &str,
    ) -> Result<Questionnaire, StoreError> {
        let query = format!(
            "SELECT {QUESTIONNAIRE_COLUMNS} FROM questionnaires WHERE id = $1 AND study_id = $2"
        );
        let row = sqlx::query_as::<_, Questionnaire>(&query)
            .bind(questionnaire_id)
            .bind(study_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                StoreError::not_found(
                    "questionnaire",
                    format!("{questionnaire_id} in study {study_id}"),
                )
            })?;
        checked(row)
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn get_pending_schedule(
        &self,
        questionnaire_id: &str,
        participant_id: &str,
        study_id: Option<&str>,
    ) -> Result<ScheduledQuestionnaire, StoreError> {
        let row = match study_id {
            None => {
                sqlx::query_as::<_, ScheduledQuestionnaire>(
                    r#"
                    SELECT id, questionnaire_id, participant_id, scheduled_at, status
                    FROM scheduled_questionnaires
                    WHERE questionnaire_id = $1 AND participant_id = $2 AND status = 'pending'
                    "#,
                )
                .bind(questionnaire_id)
                .bind(participant_id)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(study_id) => {
                sqlx::query_as::<_, ScheduledQuestionnaire>(
                    r#"
                    SELECT s.id, s.questionnaire_id, s.participant_id, s.scheduled_at, s.status
                    FROM scheduled_questionnaires s
                    JOIN questionnaires q ON q.id = s.questionnaire_id
                    WHERE s.questionnaire_id = $1 AND s.participant_id = $2
                      AND s.status = 'pending' AND q.study_id = $3
                    "#,
                )
                .bind(questionnaire_id)
                .bind(participant_id)
                .bind(study_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.ok_or_else(|| {
            StoreError::not_found(
                "pending scheduled questionnaire",
                format!("questionnaire {questionnaire_id}, participant {participant_id}"),
            )
        })
    }

    async fn mark_schedule_completed(&self, schedule_id: &str) -> Result<(), StoreError> {
        let outcome = sqlx::query(
            "UPDATE scheduled_questionnaires SET status = $1 WHERE id = $2 AND status = $3",
        )
        .bind(ScheduleStatus::Completed.as_str())
        .bind(schedule_id)
        .bind(ScheduleStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                schedule_id: schedule_id.to_string(),
            });
        }
        debug!("Marked scheduled questionnaire {schedule_id} completed");
        Ok(())
    }

    async fn create_schedule(&self, schedule: &ScheduledQuestionnaire) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_questionnaires
                (id, questionnaire_id, participant_id, scheduled_at, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&schedule.id)
        .bind(&schedule.questionnaire_id)
        .bind(&schedule.participant_id)
        .bind(schedule.scheduled_at.to_string())
        .bind(ScheduleStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_schedules(
        &self,
        participant_id: &str,
        questionnaire_id: Option<&str>,
    ) -> Result<Vec<ScheduledQuestionnaire>, StoreError> {
        // The fixed layout sorts lexicographically in chronological order.
        Ok(sqlx::query_as::<_, ScheduledQuestionnaire>(
            r#"
            SELECT id, questionnaire_id, participant_id, scheduled_at, status
            FROM scheduled_questionnaires
            WHERE participant_id = $1 AND ($2::TEXT IS NULL OR questionnaire_id = $2)
            ORDER BY scheduled_at ASC, id ASC
            "#,
        )
        .bind(participant_id)
        .bind(questionnaire_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl ResultStore for PgStore {
    async fn create_result(&self, result: &QuestionnaireResult) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO questionnaire_results
                (id, answers, questionnaire_id, participant_id,
                 questionnaire_schedule_id, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&result.id)
        .bind(&result.answers)
        .bind(&result.questionnaire_id)
        .bind(&result.participant_id)
        .bind(&result.questionnaire_schedule_id)
        .bind(result.completed_at.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ParticipantStore for PgStore {
    async fn get_participant(&self, participant_id: &str) -> Result<Participant, StoreError> {
        sqlx::query_as::<_, Participant>("SELECT id, name FROM participants WHERE id = $1")
            .bind(participant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("participant", participant_id))
    }
}
