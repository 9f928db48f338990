//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! gallery-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `GALLERY_DATABASE_URL` - `PostgreSQL` connection string of the backend
//!   database (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/gallery/migrations/`:
//! ```text
//! migrations/
//! ├── 20240601000001_create_apps.sql
//! ├── 20240601000002_create_profiles.sql
//! └── 20240601000003_row_level_security.sql
//! ```
//!
//! The session table is created afterwards by the session store itself.

use webapps_gallery::{config, db};

use super::CliError;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails or
/// a migration fails.
pub async fn run() -> Result<(), CliError> {
    let database_url = config::database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
