//! Axum route handler for inbound completion events.

use axum::{extract::State, http::StatusCode};
use tracing::warn;

use crate::errors::AppError;
use crate::models::event::CompletionEvent;
use crate::state::AppState;

/// POST /api/v1/completions
///
/// Takes the raw body so a malformed event is reported as a decode error
/// rather than axum's generic rejection.
pub async fn handle_completion_event(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, String), AppError> {
    let event = CompletionEvent::from_json(&body).map_err(|e| {
        warn!("Rejected completion event: {e}");
        AppError::Decode(e.to_string())
    })?;

    let event_id = event.id.clone();
    let response = state.workflow.handle_completion(event).await;
    if !response.is_success() {
        warn!(
            "Completion {event_id} answered {}: {:?}",
            response.status, response.report.failures
        );
    }
    Ok((response.status, response.body))
}
