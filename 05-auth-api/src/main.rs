// Entrypoint: logging, configuration, database connection, state wiring, then serve.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing_subscriber::{fmt, EnvFilter};

use auth_api::config::AppConfig;
use auth_api::database::connect_db;
use auth_api::handlers::AppState;
use auth_api::server::{bind, build_router, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pretty logs by default; override with RUST_LOG.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,axum=info,tower_http=info"));
    fmt().with_env_filter(env_filter).compact().init();

    let cfg = Arc::new(AppConfig::from_env().context("loading configuration")?);

    let db = connect_db(&cfg.database).await.context("connecting to PostgreSQL")?;

    // Auth handlers are registered on this collection by the credential subsystem; the bootstrap only mounts it.
    let auth_routes: Router<AppState> = Router::new();

    let state = AppState { config: cfg.clone(), db };
    let router = build_router(state, auth_routes).context("building router")?;

    let listener = bind(&cfg.server).await.with_context(|| format!("binding {}:{}", cfg.server.host, cfg.server.port))?;
    serve(listener, router).await.context("server error")?;

    Ok(())
}
