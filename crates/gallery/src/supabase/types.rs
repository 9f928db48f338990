//! Auth provider response types.

use serde::Deserialize;
use webapps_gallery_core::UserId;

/// Token pair issued by the auth provider on sign-in, sign-up or refresh.
///
/// Implements `Debug` manually to redact the tokens.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Absolute expiry (unix seconds), when the provider sends one.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Absolute expiry in unix seconds, computed from `expires_in` if needed.
    #[must_use]
    pub fn expiry(&self, now: i64) -> i64 {
        self.expires_at
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(3600))
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// The identity part of an auth response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Sign-up answers with a session when the project auto-confirms emails and
/// with the bare user when a confirmation email went out instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}
