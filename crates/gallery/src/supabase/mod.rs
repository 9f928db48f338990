//! Client for the hosted backend (Supabase-style PostgREST + GoTrue).
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against `/rest/v1/{table}` and `/auth/v1/*`
//! - The backend is the source of truth: no local copies, no caching
//! - Every call sends the project API key as `apikey`; table calls made on
//!   behalf of a signed-in user send that user's access token as the bearer,
//!   so the backend's row level security decides what the user may read or
//!   change
//!
//! # Example
//!
//! ```rust,ignore
//! use webapps_gallery::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//!
//! let session = client.sign_in_with_password(&email, "hunter22").await?;
//! let profile = client.get_profile(Some(&session.access_token), session.user.id).await?;
//! let apps = client.list_apps(None, Some(3)).await?;
//! ```

mod auth;
mod client;
mod tables;
pub mod types;

pub use client::SupabaseClient;
pub use types::{AuthSession, AuthUser, SignUpResponse};

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors from data API calls (and transport failures of auth calls).
#[derive(Debug, Error)]
pub enum QueryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("Backend returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured backend URL could not be joined with an API path.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request matched no row (or row level security hid it).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl QueryError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::NotFound(what) => format!("{what} no longer exists"),
            Self::RateLimited(secs) => format!("Too many requests, try again in {secs} seconds"),
            Self::Http(_) | Self::Parse(_) | Self::InvalidUrl(_) => {
                "The backend could not be reached. Please try again later.".to_string()
            }
        }
    }

    /// Whether the failure is on our side or the backend's, rather than a
    /// rejected request.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::InvalidUrl(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::RateLimited(_) => false,
        }
    }
}

/// Errors from the auth provider.
///
/// Backend-originated variants carry the provider's own message, which is
/// what the auth form shows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Email not confirmed: {0}")]
    EmailNotConfirmed(String),

    /// The refresh token was rejected; the user has to sign in again.
    #[error("Session expired")]
    SessionExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other rejection from the auth provider.
    #[error("Auth provider returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The auth provider could not be reached or answered garbage.
    #[error("Auth transport error: {0}")]
    Transport(#[source] QueryError),

    /// Reading or writing the server-side session failed.
    #[error("Session store error: {0}")]
    Session(String),
}

impl AuthError {
    /// Classify a failed auth call by the provider's error code.
    #[must_use]
    pub fn from_query(err: QueryError) -> Self {
        match err {
            QueryError::Api {
                status,
                code,
                message,
            } => match code.as_deref() {
                Some("invalid_credentials" | "invalid_grant") => Self::InvalidCredentials(message),
                Some("user_already_exists" | "email_exists") => Self::UserAlreadyExists(message),
                Some("weak_password") => Self::WeakPassword(message),
                Some("email_address_invalid" | "validation_failed") => Self::InvalidEmail(message),
                Some("email_not_confirmed") => Self::EmailNotConfirmed(message),
                Some(
                    "refresh_token_not_found"
                    | "refresh_token_already_used"
                    | "session_not_found"
                    | "session_expired"
                    | "bad_jwt",
                ) => Self::SessionExpired,
                _ => Self::Rejected { status, message },
            },
            QueryError::RateLimited(secs) => Self::RateLimited(secs),
            other => Self::Transport(other),
        }
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials(msg)
            | Self::UserAlreadyExists(msg)
            | Self::WeakPassword(msg)
            | Self::InvalidEmail(msg)
            | Self::EmailNotConfirmed(msg)
            | Self::Rejected { message: msg, .. } => msg.clone(),
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::RateLimited(secs) => format!("Too many attempts, try again in {secs} seconds"),
            Self::Transport(err) => err.user_message(),
            Self::Session(_) => "Could not save your session. Please try again.".to_string(),
        }
    }

    /// Whether the provider has refused the stored session for good.
    ///
    /// Outages, 5xx answers and rate limiting say nothing about the
    /// session; only an explicit refusal does.
    #[must_use]
    pub const fn ends_session(&self) -> bool {
        match self {
            Self::SessionExpired | Self::InvalidCredentials(_) => true,
            Self::Rejected { status, .. } => matches!(*status, 400..=428 | 430..=499),
            _ => false,
        }
    }
}

/// Error body shapes of both APIs.
///
/// GoTrue answers `{"code":400,"error_code":"weak_password","msg":"..."}`
/// (older versions `{"error":"invalid_grant","error_description":"..."}`),
/// PostgREST answers `{"code":"42501","message":"...","details":null,"hint":null}`.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ApiErrorBody {
    fn into_error(self, status: StatusCode) -> QueryError {
        let code = self
            .error_code
            .or_else(|| match self.code {
                Some(serde_json::Value::String(code)) => Some(code),
                _ => None,
            })
            .or_else(|| self.error.clone());

        let message = self
            .msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "Request failed ({})",
                    status.canonical_reason().unwrap_or("unknown status")
                )
            });

        QueryError::Api {
            status: status.as_u16(),
            code,
            message,
        }
    }
}

/// Build a [`QueryError::Api`] from a non-success response body.
fn api_error(status: StatusCode, body: &str) -> QueryError {
    serde_json::from_str::<ApiErrorBody>(body)
        .unwrap_or_default()
        .into_error(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_gotrue_body() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        let QueryError::Api {
            status,
            code,
            message,
        } = err
        else {
            panic!("expected api error");
        };
        assert_eq!(status, 400);
        assert_eq!(code.as_deref(), Some("invalid_credentials"));
        assert_eq!(message, "Invalid login credentials");
    }

    #[test]
    fn test_api_error_legacy_gotrue_body() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#,
        );
        assert!(matches!(
            err,
            QueryError::Api { ref code, ref message, .. }
                if code.as_deref() == Some("invalid_grant") && message == "Email not confirmed"
        ));
    }

    #[test]
    fn test_api_error_postgrest_body() {
        let err = api_error(
            StatusCode::FORBIDDEN,
            r#"{"code":"42501","details":null,"hint":null,"message":"new row violates row-level security policy for table \"apps\""}"#,
        );
        assert_eq!(
            err.user_message(),
            "new row violates row-level security policy for table \"apps\""
        );
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_api_error_unparseable_body() {
        let err = api_error(StatusCode::BAD_GATEWAY, "<html>upstream down</html>");
        assert_eq!(err.user_message(), "Request failed (Bad Gateway)");
        assert!(err.is_server_error());
    }

    #[test]
    fn test_auth_error_classification() {
        let api = |code: &str| QueryError::Api {
            status: 422,
            code: Some(code.to_string()),
            message: format!("{code} happened"),
        };

        assert!(matches!(
            AuthError::from_query(api("user_already_exists")),
            AuthError::UserAlreadyExists(_)
        ));
        assert!(matches!(
            AuthError::from_query(api("weak_password")),
            AuthError::WeakPassword(_)
        ));
        assert!(matches!(
            AuthError::from_query(api("refresh_token_not_found")),
            AuthError::SessionExpired
        ));
        assert!(matches!(
            AuthError::from_query(api("something_new")),
            AuthError::Rejected { status: 422, .. }
        ));
        assert!(matches!(
            AuthError::from_query(QueryError::RateLimited(30)),
            AuthError::RateLimited(30)
        ));
    }

    #[test]
    fn test_only_refusals_end_the_session() {
        let refresh_failure = |status: u16, code: Option<&str>| {
            AuthError::from_query(QueryError::Api {
                status,
                code: code.map(ToString::to_string),
                message: "refresh failed".to_string(),
            })
        };

        assert!(refresh_failure(400, Some("refresh_token_not_found")).ends_session());
        assert!(refresh_failure(400, Some("invalid_grant")).ends_session());
        assert!(refresh_failure(403, None).ends_session());

        assert!(!refresh_failure(503, None).ends_session());
        assert!(!refresh_failure(500, Some("unexpected_failure")).ends_session());
        assert!(!refresh_failure(429, None).ends_session());
        assert!(!AuthError::from_query(QueryError::RateLimited(10)).ends_session());
        assert!(!AuthError::Transport(QueryError::NotFound("x".to_string())).ends_session());
    }

    #[test]
    fn test_auth_error_user_message_is_backend_message() {
        let err = AuthError::from_query(QueryError::Api {
            status: 400,
            code: Some("invalid_credentials".to_string()),
            message: "Invalid login credentials".to_string(),
        });
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[test]
    fn test_transport_errors_hide_details() {
        let err = AuthError::Transport(QueryError::NotFound("x".to_string()));
        assert_eq!(err.user_message(), "x no longer exists");

        let err = AuthError::Session("pool timed out".to_string());
        assert!(!err.user_message().contains("pool"));
    }
}
