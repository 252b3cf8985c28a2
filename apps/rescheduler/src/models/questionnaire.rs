use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Questionnaire definition, including its repetition policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Questionnaire {
    pub id: String,
    pub study_id: String,
    pub name: String,
    /// Opaque question payload (JSON text).
    pub questions: String,
    /// `None` means the series never ends on its own.
    pub max_attempts: Option<i32>,
    pub hours_between_attempts: i32,
}

impl Questionnaire {
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }

    /// Checks the invariants a stored row must satisfy before the workflow
    /// relies on it.
    pub fn validate(&self) -> Result<(), String> {
        if self.hours_between_attempts < 0 {
            return Err(format!(
                "questionnaire {} has negative hours_between_attempts ({})",
                self.id, self.hours_between_attempts
            ));
        }
        Ok(())
    }
}
