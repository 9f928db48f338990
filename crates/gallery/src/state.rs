//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::GalleryConfig;
use crate::supabase::{QueryError, SupabaseClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It holds no per-user data:
/// who is signed in comes from the session, per request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GalleryConfig,
    supabase: SupabaseClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built from the config.
    pub fn new(config: GalleryConfig) -> Result<Self, QueryError> {
        let supabase = SupabaseClient::new(&config.supabase)?;

        Ok(Self {
            inner: Arc::new(AppStateInner { config, supabase }),
        })
    }

    /// Get a reference to the gallery configuration.
    #[must_use]
    pub fn config(&self) -> &GalleryConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }
}
