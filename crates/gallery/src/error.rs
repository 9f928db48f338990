//! Unified error handling with Sentry integration.
//!
//! Most gallery handlers turn failures into notices on the page they render.
//! Where a handler cannot render anything sensible it returns `AppError`,
//! which captures server-side failures to Sentry before responding.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::supabase::{AuthError, QueryError};

/// Application-level error type for the gallery.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend data call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] QueryError),

    /// Auth provider call failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Template rendering or other internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_side(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Backend(err) | Self::Auth(AuthError::Transport(err)) => err.is_server_error(),
            Self::Auth(AuthError::Session(_)) => true,
            Self::Auth(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        Self::Internal(format!("template rendering failed: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_side() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Internal(_) | Self::Auth(AuthError::Session(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Backend(QueryError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(QueryError::RateLimited(_)) | Self::Auth(AuthError::RateLimited(_)) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::Backend(QueryError::Api { status, .. }) if *status < 500 => StatusCode::FORBIDDEN,
            Self::Backend(_) | Self::Auth(AuthError::Transport(_)) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthError::SessionExpired) => StatusCode::UNAUTHORIZED,
            Self::Auth(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Backend(err) => err.user_message(),
            Self::Auth(err) => err.user_message(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for admin actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("admin", "Approved user", &[("user_id", "5f0c...")]);
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
