//! Place service: per-user CRUD over the places collection.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::live::{ChangeHub, Collection};
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::place::{CreatePlace, Place};

/// Filters for listing places.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlaceFilters {
    pub journey_id: Option<Uuid>,
}

/// Create a place under one of the user's journeys. The parent journey is
/// not verified to exist: the reference may already dangle and the dashboard
/// grouping tolerates it.
pub async fn create(
    pool: &PgPool,
    hub: &ChangeHub,
    user_id: Uuid,
    input: &CreatePlace,
) -> Result<Place, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required.".to_string()));
    }

    let country = input
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let place = sqlx::query_as::<_, Place>(
        r#"
        INSERT INTO places (user_id, journey_id, name, country)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(input.journey_id)
    .bind(input.name.trim())
    .bind(country)
    .fetch_one(pool)
    .await?;

    hub.notify(Collection::Places, user_id);
    Ok(place)
}

/// List the user's places, optionally restricted to one journey.
pub async fn list(
    pool: &PgPool,
    user_id: Uuid,
    filters: &PlaceFilters,
    pagination: &Pagination,
) -> Result<PagedResult<Place>, AppError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM places WHERE user_id = $1 AND ($2::uuid IS NULL OR journey_id = $2)",
    )
    .bind(user_id)
    .bind(filters.journey_id)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, Place>(
        r#"
        SELECT * FROM places
        WHERE user_id = $1 AND ($2::uuid IS NULL OR journey_id = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(filters.journey_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

/// Delete one of the user's places.
pub async fn delete(
    pool: &PgPool,
    hub: &ChangeHub,
    user_id: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM places WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Place not found".to_string()));
    }

    hub.notify(Collection::Places, user_id);
    Ok(())
}
