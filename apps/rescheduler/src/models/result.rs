use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::timestamp::Timestamp;

/// Answers recorded for one processed completion. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QuestionnaireResult {
    pub id: String,
    pub answers: String,
    pub questionnaire_id: String,
    pub participant_id: String,
    pub questionnaire_schedule_id: String,
    #[sqlx(try_from = "String")]
    pub completed_at: Timestamp,
}
