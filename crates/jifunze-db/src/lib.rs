//! # Jifunze DB
//!
//! Database pool construction for the Jifunze API.
//!
//! Every connection handed out by the pool carries a server-side
//! `statement_timeout`, and acquiring a connection is bounded by
//! `acquire_timeout`. Both failures surface as retryable errors instead of
//! blocking a request indefinitely.
//!
//! # Example
//!
//! ```ignore
//! use jifunze_config::DatabaseConfig;
//! use jifunze_db::init_db_pool;
//!
//! let pool = init_db_pool(&DatabaseConfig::from_env()).await?;
//! ```

use std::str::FromStr;

use jifunze_config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;

// Re-export PgPool for convenience
pub use sqlx::PgPool;

/// Builds the PostgreSQL pool described by `config`.
///
/// # Errors
///
/// Returns the connection error if the URL is malformed or the first
/// connection cannot be established.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let connect_options = PgConnectOptions::from_str(&config.url)?.options([(
        "statement_timeout",
        config.statement_timeout_ms.to_string(),
    )]);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_with(connect_options)
        .await?;

    info!(
        db.max_connections = config.max_connections,
        db.acquire_timeout_secs = config.acquire_timeout_secs,
        db.statement_timeout_ms = config.statement_timeout_ms,
        "Database pool initialized"
    );

    Ok(pool)
}

/// Applies the migrations embedded from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
