use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::DatabaseConfig, models::AppError};

/// Opens the PostgreSQL pool used by the auth routes. Called once at startup; an error here is fatal.
pub async fn connect_db(cfg: &DatabaseConfig) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .connect(&cfg.url)
        .await?;
    tracing::info!(max_connections = cfg.max_connections, "PostgreSQL connected");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unparsable_url_is_a_database_error() {
        let cfg = DatabaseConfig { url: "not a database url".into(), max_connections: 1, connect_timeout_secs: 1 };
        let err = connect_db(&cfg).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
