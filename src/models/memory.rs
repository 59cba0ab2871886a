//! Memory model: a moment recorded against a journey.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Memory row. Like places, `journey_id` may dangle after a journey is
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Memory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub journey_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemory {
    pub journey_id: Uuid,
    pub title: String,
}
