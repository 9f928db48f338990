//! `PostgreSQL` access: session storage and schema migrations.
//!
//! App and profile rows are read and written through the backend's data API
//! (see [`crate::supabase`]), never with direct SQL. The server talks to
//! `PostgreSQL` only for the tower-sessions table.
//!
//! # Migrations
//!
//! `crates/gallery/migrations/` holds the backend schema: the `apps` and
//! `profiles` tables, the sign-up trigger that creates a profile for every
//! new auth user, and the row level security policies. Run them with:
//! ```bash
//! cargo run -p gallery-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use tower_sessions_sqlx_store::PostgresStore;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Errors from [`migrate`].
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("schema migration failed: {0}")]
    Schema(#[from] MigrateError),
    #[error("session table migration failed: {0}")]
    Sessions(#[from] sqlx::Error),
}

/// Apply the backend schema migrations, then create the session table.
///
/// # Errors
///
/// Returns the first failing step.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Schema migrations applied");

    PostgresStore::new(pool.clone()).migrate().await?;
    tracing::info!("Session table ready");

    Ok(())
}
