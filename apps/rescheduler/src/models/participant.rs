use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A study participant. Created outside this service; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: String,
    pub name: String,
}
