pub mod config;
pub mod db;
pub mod errors;
pub mod live;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body size.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state passed to all Axum handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: config::AppConfig,
    pub live: live::ChangeHub,
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = match state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(_) => CorsLayer::new(),
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/journeys",
            get(routes::journeys::list).post(routes::journeys::create),
        )
        .route(
            "/journeys/{id}",
            get(routes::journeys::get_by_id)
                .put(routes::journeys::update)
                .delete(routes::journeys::delete),
        )
        .route(
            "/places",
            get(routes::places::list).post(routes::places::create),
        )
        .route("/places/{id}", delete(routes::places::delete))
        .route(
            "/memories",
            get(routes::memories::list).post(routes::memories::create),
        )
        .route("/memories/{id}", delete(routes::memories::delete))
        .route("/dashboard/stats", get(routes::dashboard::stats))
        .route("/dashboard/stream", get(routes::dashboard::stream));

    Router::new()
        .route("/health/live", get(routes::health::live))
        .route("/health/ready", get(routes::health::ready))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
