pub mod event;
pub mod participant;
pub mod questionnaire;
pub mod result;
pub mod schedule;
pub mod timestamp;
