//! CLI command implementations.

pub mod apps;
pub mod migrate;
pub mod users;

use thiserror::Error;
use webapps_gallery::config::{ConfigError, SupabaseConfig};
use webapps_gallery::db::MigrationError;
use webapps_gallery::supabase::{QueryError, SupabaseClient};
use webapps_gallery_core::EmailError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Missing or invalid environment configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] QueryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No profile for that email.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    /// Seed file could not be read.
    #[error("Could not read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Seed file is not valid YAML for the expected shape.
    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Seed file parsed but some entries failed validation.
    #[error("{0} invalid app(s) in seed file")]
    InvalidSeed(usize),
}

/// Backend client authenticated with the service-role key.
///
/// Calls made with it pass `None` as the bearer, so the key itself is sent
/// and row level security does not apply.
fn service_client() -> Result<SupabaseClient, CliError> {
    let config = SupabaseConfig::from_env("SUPABASE_SERVICE_ROLE_KEY")?;
    Ok(SupabaseClient::new(&config)?)
}
