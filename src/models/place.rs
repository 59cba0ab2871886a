//! Place model: a visited location attached to a journey.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Place row. `journey_id` is a bare reference — deleting a journey does
/// not cascade, so it may point at a journey that no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Place {
    pub id: Uuid,
    pub user_id: Uuid,
    pub journey_id: Uuid,
    pub name: String,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlace {
    pub journey_id: Uuid,
    pub name: String,
    pub country: Option<String>,
}
