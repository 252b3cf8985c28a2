use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use crate::models::timestamp::Timestamp;

/// Lifecycle of a scheduled questionnaire. The only transition is
/// `Pending -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Pending,
    Completed,
}

#[derive(Debug, Error)]
#[error("unknown schedule status '{0}'")]
pub struct UnknownStatus(pub String);

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScheduleStatus::Pending),
            "completed" => Ok(ScheduleStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ScheduleStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A request for a participant to fill in a questionnaire at a given time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScheduledQuestionnaire {
    pub id: String,
    pub questionnaire_id: String,
    pub participant_id: String,
    #[sqlx(try_from = "String")]
    pub scheduled_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub status: ScheduleStatus,
}

impl ScheduledQuestionnaire {
    /// New schedules always start out pending.
    pub fn pending(
        id: String,
        questionnaire_id: String,
        participant_id: String,
        scheduled_at: Timestamp,
    ) -> Self {
        Self {
            id,
            questionnaire_id,
            participant_id,
            scheduled_at,
            status: ScheduleStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_known_values() {
        assert_eq!("pending".parse::<ScheduleStatus>().unwrap(), ScheduleStatus::Pending);
        assert_eq!(
            "completed".parse::<ScheduleStatus>().unwrap(),
            ScheduleStatus::Completed
        );
    }

    #[test]
    fn test_status_rejects_unknown_and_case_variants() {
        assert!("Pending".parse::<ScheduleStatus>().is_err());
        assert!("cancelled".parse::<ScheduleStatus>().is_err());
    }

    #[test]
    fn test_pending_constructor_sets_status() {
        let at: Timestamp = "2023-12-05 02:11:00".parse().unwrap();
        let schedule = ScheduledQuestionnaire::pending(
            "s-2".to_string(),
            "q-1".to_string(),
            "p-1".to_string(),
            at,
        );
        assert_eq!(schedule.status, ScheduleStatus::Pending);
        assert_eq!(schedule.scheduled_at, at);
    }
}
