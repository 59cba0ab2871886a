//! Memory routes: CRUD over the authenticated user's memories.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::memory::{CreateMemory, Memory};
use crate::models::pagination::{PagedResult, Pagination};
use crate::services::memory as memory_service;
use crate::AppState;

/// GET /api/v1/memories — list the user's memories, newest-first.
pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<PagedResult<Memory>>>, AppError> {
    let result = memory_service::list(&state.db, current_user.id, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/memories — create a memory.
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateMemory>,
) -> Result<Json<ApiResponse<Memory>>, AppError> {
    let memory = memory_service::create(&state.db, &state.live, current_user.id, &body).await?;
    Ok(ApiResponse::success(memory))
}

/// DELETE /api/v1/memories/:id — delete a memory.
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    memory_service::delete(&state.db, &state.live, current_user.id, id).await?;
    Ok(ApiResponse::success("Memory deleted"))
}
