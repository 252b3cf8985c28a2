//! Read-only participant endpoints for inspecting scheduling outcomes.

pub mod handlers;
