//! Session-related types.
//!
//! Types stored in the server-side session for authentication state.

use serde::{Deserialize, Serialize};

use webapps_gallery_core::{Email, Profile, UserId};

use crate::supabase::AuthSession;

/// Seconds before expiry at which an access token is treated as expired,
/// so a token does not lapse halfway through a request.
const EXPIRY_LEEWAY_SECONDS: i64 = 30;

/// Session-stored identity: the auth provider's token pair plus the last
/// profile fetched for the user.
///
/// Implements `Debug` manually to redact the tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentSession {
    pub user_id: UserId,
    pub email: Email,
    access_token: String,
    refresh_token: String,
    /// Access token expiry, unix seconds.
    pub expires_at: i64,
    /// Last known profile, used when a fresh fetch fails.
    pub profile: Option<Profile>,
}

impl CurrentSession {
    /// Build a session from a provider response.
    ///
    /// `email` is the address the user typed; the provider's copy wins when
    /// present and well-formed.
    #[must_use]
    pub fn from_auth(auth: AuthSession, email: &Email, now: i64) -> Self {
        let expires_at = auth.expiry(now);
        let email = auth
            .user
            .email
            .as_deref()
            .and_then(|e| Email::parse(e).ok())
            .unwrap_or_else(|| email.clone());

        Self {
            user_id: auth.user.id,
            email,
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
            expires_at,
            profile: None,
        }
    }

    /// Swap in a refreshed token pair, keeping identity and profile.
    pub fn replace_tokens(&mut self, auth: AuthSession, now: i64) {
        self.expires_at = auth.expiry(now);
        self.access_token = auth.access_token;
        self.refresh_token = auth.refresh_token;
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now + EXPIRY_LEEWAY_SECONDS >= self.expires_at
    }
}

impl std::fmt::Debug for CurrentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentSession")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("profile", &self.profile)
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in session.
    pub const CURRENT_SESSION: &str = "current_session";
}
