//! Session middleware configuration.
//!
//! Sessions live server-side (`PostgreSQL` in production, memory in tests);
//! the browser only holds an opaque cookie.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::GalleryConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "gallery_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer around any session store.
///
/// The sessions table of the `PostgreSQL` store is created by
/// `gallery-cli migrate`.
#[must_use]
pub fn create_session_layer<Store: SessionStore>(
    store: Store,
    config: &GalleryConfig,
) -> SessionManagerLayer<Store> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
