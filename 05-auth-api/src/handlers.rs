use std::sync::Arc;

use axum::{
    debug_handler,
    http::{header::CONTENT_TYPE, Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    config::AppConfig,
    models::{ApiResponse, AppError, HealthStatus, HEALTH_MESSAGE},
};

pub const AUTH_PREFIX: &str = "/api/auth";
pub const HEALTH_PATH: &str = "/api/health";

/// Shared, read-only state handed to every route, including the mounted auth collection.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: PgPool,
}

/// Route table: the auth collection under `/api/auth`, the health check, and the 404 fallback.
/// Paths under the auth prefix that the collection doesn't match fall through to `not_found`,
/// and so does a known path hit with a method nobody registered.
pub fn app(state: AppState, auth_routes: Router<AppState>) -> Router {
    Router::new()
        .nest(AUTH_PREFIX, auth_routes)
        .route(HEALTH_PATH, get(health))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::map_response(method_mismatch_as_not_found))
}

/// Liveness only: does not touch the database.
#[debug_handler]
pub async fn health() -> ApiResponse<HealthStatus> {
    ApiResponse::success(HEALTH_MESSAGE, HealthStatus::at(Utc::now()))
}

pub async fn not_found(method: Method, uri: Uri) -> AppError {
    tracing::debug!(%method, %uri, "no route matched");
    AppError::RouteNotFound
}

// axum answers a method mismatch with a bodiless 405; here it is just another unmatched route.
// A 405 that a handler builds itself carries a body with a content type and passes through.
async fn method_mismatch_as_not_found(resp: Response) -> Response {
    if resp.status() == StatusCode::METHOD_NOT_ALLOWED && !resp.headers().contains_key(CONTENT_TYPE) {
        AppError::RouteNotFound.into_response()
    } else {
        resp
    }
}
