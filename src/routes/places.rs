//! Place routes: CRUD over the authenticated user's places.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::place::{CreatePlace, Place};
use crate::services::place::{self as place_service, PlaceFilters};
use crate::AppState;

/// GET /api/v1/places — list places, optionally filtered by journey.
pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<PlaceFilters>,
) -> Result<Json<ApiResponse<PagedResult<Place>>>, AppError> {
    let result = place_service::list(&state.db, current_user.id, &filters, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/places — create a place.
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreatePlace>,
) -> Result<Json<ApiResponse<Place>>, AppError> {
    let place = place_service::create(&state.db, &state.live, current_user.id, &body).await?;
    Ok(ApiResponse::success(place))
}

/// DELETE /api/v1/places/:id — delete a place.
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    place_service::delete(&state.db, &state.live, current_user.id, id).await?;
    Ok(ApiResponse::success("Place deleted"))
}
