//! Dashboard routes: live aggregated statistics for the overview page.
//!
//! Both endpoints attach a fresh aggregator scoped to the caller. The
//! one-shot endpoint detaches after the journeys collection resolves; the
//! SSE endpoint keeps the aggregator alive for the lifetime of the
//! connection and tears it down when the client goes away. Reconnecting is
//! the manual-retry path after a terminal subscription error.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures_util::stream::Stream;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::services::aggregator::{
    AggregatorContext, DashboardAggregator, DashboardModel, DashboardUser,
};
use crate::services::auth as auth_service;
use crate::AppState;

async fn context(state: &AppState, current_user: &CurrentUser) -> Result<AggregatorContext, AppError> {
    let user = auth_service::find_user_by_id(&state.db, current_user.id).await?;
    Ok(AggregatorContext {
        pool: state.db.clone(),
        hub: state.live.clone(),
        user: DashboardUser::from(&user),
    })
}

/// GET /api/v1/dashboard/stats — aggregated dashboard read model.
///
/// Waits for the initial journeys snapshot (or a journeys error), returns
/// the model at that instant, and detaches. Places/memories counts may still
/// read zero if their first snapshots have not landed yet.
pub async fn stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<DashboardModel>>, AppError> {
    let ctx = context(&state, &current_user).await?;
    let aggregator = DashboardAggregator::attach(ctx);
    let model = aggregator.ready().await;
    aggregator.detach();
    Ok(ApiResponse::success(model))
}

/// GET /api/v1/dashboard/stream — live dashboard updates over SSE.
///
/// Emits the current model immediately, then one event per recompute.
pub async fn stream(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let ctx = context(&state, &current_user).await?;
    let aggregator = DashboardAggregator::attach(ctx);

    let stream = async_stream::stream! {
        let mut rx = aggregator.watch();
        loop {
            let payload = serde_json::to_string(&*rx.borrow_and_update());
            match payload {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => tracing::error!(error = %e, "Failed to serialize dashboard model"),
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
        // dropping the stream drops the aggregator: all three subscriptions stop
        drop(aggregator);
    };

    Ok(Sse::new(stream))
}
