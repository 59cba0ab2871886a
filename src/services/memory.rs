//! Memory service: per-user CRUD over the memories collection.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::live::{ChangeHub, Collection};
use crate::models::memory::{CreateMemory, Memory};
use crate::models::pagination::{PagedResult, Pagination};

/// Create a memory against one of the user's journeys. As with places, the
/// parent reference is not verified and may dangle.
pub async fn create(
    pool: &PgPool,
    hub: &ChangeHub,
    user_id: Uuid,
    input: &CreateMemory,
) -> Result<Memory, AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required.".to_string()));
    }

    let memory = sqlx::query_as::<_, Memory>(
        r#"
        INSERT INTO memories (user_id, journey_id, title)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(input.journey_id)
    .bind(input.title.trim())
    .fetch_one(pool)
    .await?;

    hub.notify(Collection::Memories, user_id);
    Ok(memory)
}

/// List the user's memories, newest-first.
pub async fn list(
    pool: &PgPool,
    user_id: Uuid,
    pagination: &Pagination,
) -> Result<PagedResult<Memory>, AppError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM memories WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, Memory>(
        r#"
        SELECT * FROM memories
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

/// Delete one of the user's memories.
pub async fn delete(
    pool: &PgPool,
    hub: &ChangeHub,
    user_id: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM memories WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Memory not found".to_string()));
    }

    hub.notify(Collection::Memories, user_id);
    Ok(())
}
