//! In-memory provider used by the workflow and route tests.
//!
//! Individual operations can be made to fail so partial-failure paths can be
//! exercised without a database.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::participant::Participant;
use crate::models::questionnaire::Questionnaire;
use crate::models::result::QuestionnaireResult;
use crate::models::schedule::{ScheduleStatus, ScheduledQuestionnaire};
use crate::store::{ParticipantStore, QuestionnaireStore, ResultStore, ScheduleStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetQuestionnaire,
    GetPendingSchedule,
    MarkCompleted,
    CreateSchedule,
    CreateResult,
}

#[derive(Default)]
struct Tables {
    participants: HashMap<String, Participant>,
    questionnaires: HashMap<String, Questionnaire>,
    schedules: Vec<ScheduledQuestionnaire>,
    results: Vec<QuestionnaireResult>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<StoreOp>>,
    steal_pending: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_participant(&self, participant: Participant) {
        let mut tables = self.tables.lock().unwrap();
        tables.participants.insert(participant.id.clone(), participant);
    }

    pub fn insert_questionnaire(&self, questionnaire: Questionnaire) {
        let mut tables = self.tables.lock().unwrap();
        tables
            .questionnaires
            .insert(questionnaire.id.clone(), questionnaire);
    }

    /// Seeds a schedule as-is, status included.
    pub fn insert_schedule(&self, schedule: ScheduledQuestionnaire) {
        self.tables.lock().unwrap().schedules.push(schedule);
    }

    pub fn fail(&self, op: StoreOp) {
        self.failing.lock().unwrap().insert(op);
    }

    /// The next pending-schedule lookup returns its row and then completes it,
    /// as if a concurrent completion for the same pair got there first.
    pub fn simulate_concurrent_completion(&self) {
        *self.steal_pending.lock().unwrap() = true;
    }

    pub fn schedules(&self) -> Vec<ScheduledQuestionnaire> {
        self.tables.lock().unwrap().schedules.clone()
    }

    pub fn results(&self) -> Vec<QuestionnaireResult> {
        self.tables.lock().unwrap().results.clone()
    }

    pub fn schedule(&self, id: &str) -> Option<ScheduledQuestionnaire> {
        self.schedules().into_iter().find(|s| s.id == id)
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::Persistence(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionnaireStore for MemoryStore {
    async fn get_questionnaire(&self, questionnaire_id: &str) -> Result<Questionnaire, StoreError> {
        self.check(StoreOp::GetQuestionnaire)?;
        let questionnaire = self
            .tables
            .lock()
            .unwrap()
            .questionnaires
            .get(questionnaire_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("questionnaire", questionnaire_id))?;
        questionnaire.validate().map_err(StoreError::InvalidRow)?;
        Ok(questionnaire)
    }

    async fn get_questionnaire_in_study(
        &self,
        questionnaire_id: &str,
        study_id: &str,
    ) -> Result<Questionnaire, StoreError> {
        let questionnaire = self.get_questionnaire(questionnaire_id).await?;
        if questionnaire.study_id != study_id {
            return Err(StoreError::not_found(
                "questionnaire",
                format!("{questionnaire_id} in study {study_id}"),
            ));
        }
        Ok(questionnaire)
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn get_pending_schedule(
        &self,
        questionnaire_id: &str,
        participant_id: &str,
        study_id: Option<&str>,
    ) -> Result<ScheduledQuestionnaire, StoreError> {
        self.check(StoreOp::GetPendingSchedule)?;
        let mut tables = self.tables.lock().unwrap();
        let Tables {
            questionnaires,
            schedules,
            ..
        } = &mut *tables;
        let in_study = |s: &ScheduledQuestionnaire| match study_id {
            None => true,
            Some(study) => questionnaires
                .get(&s.questionnaire_id)
                .is_some_and(|q| q.study_id == study),
        };
        let found = schedules
            .iter_mut()
            .find(|s| {
                s.questionnaire_id == questionnaire_id
                    && s.participant_id == participant_id
                    && s.status == ScheduleStatus::Pending
                    && in_study(s)
            })
            .ok_or_else(|| {
                StoreError::not_found(
                    "pending scheduled questionnaire",
                    format!("questionnaire {questionnaire_id}, participant {participant_id}"),
                )
            })?;

        let row = found.clone();
        if std::mem::take(&mut *self.steal_pending.lock().unwrap()) {
            found.status = ScheduleStatus::Completed;
        }
        Ok(row)
    }

    async fn mark_schedule_completed(&self, schedule_id: &str) -> Result<(), StoreError> {
        self.check(StoreOp::MarkCompleted)?;
        let mut tables = self.tables.lock().unwrap();
        match tables
            .schedules
            .iter_mut()
            .find(|s| s.id == schedule_id && s.status == ScheduleStatus::Pending)
        {
            Some(schedule) => {
                schedule.status = ScheduleStatus::Completed;
                Ok(())
            }
            None => Err(StoreError::Conflict {
                schedule_id: schedule_id.to_string(),
            }),
        }
    }

    async fn create_schedule(&self, schedule: &ScheduledQuestionnaire) -> Result<(), StoreError> {
        self.check(StoreOp::CreateSchedule)?;
        let mut stored = schedule.clone();
        stored.status = ScheduleStatus::Pending;
        self.tables.lock().unwrap().schedules.push(stored);
        Ok(())
    }

    async fn list_schedules(
        &self,
        participant_id: &str,
        questionnaire_id: Option<&str>,
    ) -> Result<Vec<ScheduledQuestionnaire>, StoreError> {
        let mut schedules: Vec<_> = self
            .schedules()
            .into_iter()
            .filter(|s| {
                s.participant_id == participant_id
                    && questionnaire_id.map_or(true, |q| s.questionnaire_id == q)
            })
            .collect();
        schedules.sort_by(|a, b| (a.scheduled_at, &a.id).cmp(&(b.scheduled_at, &b.id)));
        Ok(schedules)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn create_result(&self, result: &QuestionnaireResult) -> Result<(), StoreError> {
        self.check(StoreOp::CreateResult)?;
        self.tables.lock().unwrap().results.push(result.clone());
        Ok(())
    }
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn get_participant(&self, participant_id: &str) -> Result<Participant, StoreError> {
        self.tables
            .lock()
            .unwrap()
            .participants
            .get(participant_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("participant", participant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::timestamp::Timestamp;

    fn pending(id: &str, at: &str) -> ScheduledQuestionnaire {
        ScheduledQuestionnaire::pending(
            id.to_string(),
            "q-1".to_string(),
            "p-1".to_string(),
            at.parse::<Timestamp>().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_mark_completed_is_conditional() {
        let store = MemoryStore::new();
        store.insert_schedule(pending("s-1", "2023-12-04 02:11:00"));

        store.mark_schedule_completed("s-1").await.unwrap();
        let second = store.mark_schedule_completed("s-1").await;

        assert!(matches!(second, Err(StoreError::Conflict { .. })));
        assert_eq!(store.schedule("s-1").unwrap().status, ScheduleStatus::Completed);
    }

    #[tokio::test]
    async fn test_completed_schedule_is_not_matched_as_pending() {
        let store = MemoryStore::new();
        store.insert_schedule(pending("s-1", "2023-12-04 02:11:00"));
        store.mark_schedule_completed("s-1").await.unwrap();

        let lookup = store.get_pending_schedule("q-1", "p-1", None).await;
        assert!(matches!(lookup, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_schedule_forces_pending() {
        let store = MemoryStore::new();
        let mut schedule = pending("s-9", "2023-12-04 02:11:00");
        schedule.status = ScheduleStatus::Completed;

        store.create_schedule(&schedule).await.unwrap();
        assert_eq!(store.schedule("s-9").unwrap().status, ScheduleStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_schedules_orders_by_time() {
        let store = MemoryStore::new();
        store.insert_schedule(pending("late", "2023-12-06 00:00:00"));
        store.insert_schedule(pending("early", "2023-12-04 00:00:00"));

        let listed = store.list_schedules("p-1", Some("q-1")).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert!(store.list_schedules("p-2", None).await.unwrap().is_empty());
    }
}
