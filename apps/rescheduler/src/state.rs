use std::sync::Arc;

use crate::store::{ParticipantStore, ScheduleStore};
use crate::workflow::CompletionWorkflow;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<CompletionWorkflow>,
    pub participants: Arc<dyn ParticipantStore>,
    /// Read access for the participant schedule listing.
    pub schedules: Arc<dyn ScheduleStore>,
}
