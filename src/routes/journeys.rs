//! Journey routes: CRUD over the authenticated user's journeys.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::journey::{CreateJourney, Journey, UpdateJourney};
use crate::models::pagination::{PagedResult, Pagination};
use crate::services::journey as journey_service;
use crate::AppState;

/// GET /api/v1/journeys — list the user's journeys, newest-first.
pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<PagedResult<Journey>>>, AppError> {
    let result = journey_service::list(&state.db, current_user.id, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/journeys — create a journey.
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateJourney>,
) -> Result<Json<ApiResponse<Journey>>, AppError> {
    let journey =
        journey_service::create(&state.db, &state.live, current_user.id, &body).await?;
    Ok(ApiResponse::success(journey))
}

/// GET /api/v1/journeys/:id — get one journey.
pub async fn get_by_id(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Journey>>, AppError> {
    let journey = journey_service::find_by_id(&state.db, current_user.id, id).await?;
    Ok(ApiResponse::success(journey))
}

/// PUT /api/v1/journeys/:id — update a journey.
pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateJourney>,
) -> Result<Json<ApiResponse<Journey>>, AppError> {
    let journey =
        journey_service::update(&state.db, &state.live, current_user.id, id, &body).await?;
    Ok(ApiResponse::success(journey))
}

/// DELETE /api/v1/journeys/:id — delete a journey (no cascade).
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    journey_service::delete(&state.db, &state.live, current_user.id, id).await?;
    Ok(ApiResponse::success("Journey deleted"))
}
