use serde::{Deserialize, Serialize};

use crate::models::timestamp::Timestamp;

/// Signal that a participant finished one attempt of a questionnaire.
/// Transient: consumed once by the completion workflow and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: String,
    pub user_id: String,
    pub study_id: String,
    pub questionnaire_id: String,
    pub completed_at: Timestamp,
    pub remaining_completions: i64,
}

impl CompletionEvent {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
