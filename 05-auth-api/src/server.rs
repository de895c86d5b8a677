//! HTTP stack around the route table: CORS, body limit, panic catching, tracing and compression,
//! plus binding, startup logging and graceful shutdown.

use std::{any::Any, future::Future, io};

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::{CorsConfig, ServerConfig},
    handlers::{app, AppState, AUTH_PREFIX, HEALTH_PATH},
    models::{ApiResponse, AppError, INTERNAL_ERROR_MESSAGE},
};

/// Full application: routes plus middleware. CORS is the outermost layer, so every
/// response (404s, 500s, caught panics) carries the same access-control headers.
pub fn build_router(state: AppState, auth_routes: Router<AppState>) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config.cors)?;
    let body_limit = state.config.body_limit;

    Ok(app(state, auth_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

/// Credentialed CORS restricted to the configured origins.
pub fn cors_layer(cfg: &CorsConfig) -> Result<CorsLayer, AppError> {
    let mut origins = Vec::with_capacity(cfg.allowed_origins.len());
    for origin in &cfg.allowed_origins {
        // Wildcards are not valid together with credentials.
        if origin == "*" {
            return Err(AppError::Config("CORS origin \"*\" cannot be combined with credentials".into()));
        }
        let value = HeaderValue::from_str(origin).map_err(|_| AppError::Config(format!("invalid CORS origin {origin:?}")))?;
        origins.push(value);
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "non-string panic payload"
    };
    tracing::error!(panic = %detail, "Unhandled panic in handler");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::failure(INTERNAL_ERROR_MESSAGE))).into_response()
}

pub async fn bind(cfg: &ServerConfig) -> io::Result<TcpListener> {
    TcpListener::bind((cfg.host.as_str(), cfg.port)).await
}

/// Serves until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, router: Router) -> io::Result<()> {
    serve_with_shutdown(listener, router, shutdown_signal()).await
}

pub async fn serve_with_shutdown<F>(listener: TcpListener, router: Router, signal: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = listener.local_addr()?.port();
    tracing::info!("Server running on port {}", port);
    tracing::info!("Health check: http://localhost:{}{}", port, HEALTH_PATH);
    tracing::info!("Auth endpoints: http://localhost:{}{}", port, AUTH_PREFIX);

    axum::serve(listener, router).with_graceful_shutdown(signal).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! { _ = ctrl_c => {}, _ = terminate => {}, }
    tracing::info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_rejects_wildcard_and_garbage() {
        let wildcard = CorsConfig { allowed_origins: vec!["*".into()] };
        assert!(matches!(cors_layer(&wildcard), Err(AppError::Config(_))));

        let garbage = CorsConfig { allowed_origins: vec!["http://bad\norigin".into()] };
        assert!(matches!(cors_layer(&garbage), Err(AppError::Config(_))));

        assert!(cors_layer(&CorsConfig::default()).is_ok());
    }

    #[test]
    fn panic_payloads_become_generic_500() {
        let resp = panic_response(Box::new(String::from("index out of bounds")));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = panic_response(Box::new(42u8));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
