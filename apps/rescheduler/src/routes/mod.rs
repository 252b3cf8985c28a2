pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::participants::handlers as participants;
use crate::state::AppState;
use crate::workflow::handlers as completions;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/completions",
            post(completions::handle_completion_event),
        )
        .route(
            "/api/v1/participants/:id",
            get(participants::handle_get_participant),
        )
        .route(
            "/api/v1/participants/:id/schedules",
            get(participants::handle_list_schedules),
        )
        .with_state(state)
}
