//! Journey service: per-user CRUD over the journeys collection.
//!
//! Every committed write notifies the change hub so live dashboard
//! subscriptions re-query and deliver a fresh snapshot.

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::live::{ChangeHub, Collection};
use crate::models::journey::{CreateJourney, Journey, UpdateJourney};
use crate::models::pagination::{PagedResult, Pagination};

/// Create a journey. The date-range invariant is enforced here, at creation
/// time only.
pub async fn create(
    pool: &PgPool,
    hub: &ChangeHub,
    user_id: Uuid,
    input: &CreateJourney,
) -> Result<Journey, AppError> {
    input.validate()?;

    let journey = sqlx::query_as::<_, Journey>(
        r#"
        INSERT INTO journeys (user_id, title, description, cover_image, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(input.title.trim())
    .bind(input.description.as_deref().map(str::trim))
    .bind(&input.cover_image)
    .bind(input.start_date)
    .bind(input.end_date)
    .fetch_one(pool)
    .await?;

    hub.notify(Collection::Journeys, user_id);
    Ok(journey)
}

/// List the user's journeys, newest-first.
pub async fn list(
    pool: &PgPool,
    user_id: Uuid,
    pagination: &Pagination,
) -> Result<PagedResult<Journey>, AppError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM journeys WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, Journey>(
        r#"
        SELECT * FROM journeys
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

/// Find one of the user's journeys by ID.
pub async fn find_by_id(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Journey, AppError> {
    sqlx::query_as::<_, Journey>("SELECT * FROM journeys WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))
}

/// Update a journey. Only provided fields change; `updated_at` is bumped.
pub async fn update(
    pool: &PgPool,
    hub: &ChangeHub,
    user_id: Uuid,
    id: Uuid,
    input: &UpdateJourney,
) -> Result<Journey, AppError> {
    if let Some(title) = &input.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("Title is required.".to_string()));
        }
    }

    let journey = sqlx::query_as::<_, Journey>(
        r#"
        UPDATE journeys SET
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            cover_image = COALESCE($5, cover_image),
            start_date = COALESCE($6, start_date),
            end_date = COALESCE($7, end_date),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(input.title.as_deref().map(str::trim))
    .bind(input.description.as_deref().map(str::trim))
    .bind(&input.cover_image)
    .bind(input.start_date)
    .bind(input.end_date)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))?;

    hub.notify(Collection::Journeys, user_id);
    Ok(journey)
}

/// Delete a journey. Places and memories referencing it are NOT cascaded —
/// their journey_id values dangle.
pub async fn delete(
    pool: &PgPool,
    hub: &ChangeHub,
    user_id: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM journeys WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Journey not found".to_string()));
    }

    hub.notify(Collection::Journeys, user_id);
    Ok(())
}
