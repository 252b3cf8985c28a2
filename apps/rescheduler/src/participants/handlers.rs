use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::participant::Participant;
use crate::models::schedule::ScheduledQuestionnaire;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScheduleFilter {
    pub questionnaire_id: Option<String>,
}

/// GET /api/v1/participants/:id
pub async fn handle_get_participant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Participant>, AppError> {
    Ok(Json(state.participants.get_participant(&id).await?))
}

/// GET /api/v1/participants/:id/schedules
///
/// Pending and completed schedules, oldest first.
pub async fn handle_list_schedules(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(filter): Query<ScheduleFilter>,
) -> Result<Json<Vec<ScheduledQuestionnaire>>, AppError> {
    let schedules = state
        .schedules
        .list_schedules(&id, filter.questionnaire_id.as_deref())
        .await?;
    Ok(Json(schedules))
}
