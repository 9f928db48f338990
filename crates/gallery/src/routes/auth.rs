//! Authentication route handlers.
//!
//! Sign-in, sign-up, the pending-approval screen and sign-out, all backed
//! by [`SessionProvider`]. Successful posts redirect with a notice code;
//! failed posts re-render the form with the backend's message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use webapps_gallery_core::{AuthView, Email, Route};

use crate::filters;
use crate::models::Notice;
use crate::services::{SessionContext, SessionProvider, SignUpOutcome};
use crate::state::AppState;
use crate::supabase::AuthError;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in and sign-up form data.
#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl CredentialsForm {
    /// Check the fields locally before calling the auth provider.
    fn validate(&self) -> Result<Email, String> {
        let email = Email::parse(&self.email).map_err(|e| e.to_string())?;
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(email)
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the auth page.
#[derive(Debug, Default, Deserialize)]
pub struct AuthPageQuery {
    pub mode: Option<String>,
    pub notice: Option<String>,
}

impl AuthPageQuery {
    fn is_signup(&self) -> bool {
        self.mode.as_deref() == Some("signup")
    }

    fn notice(&self) -> Option<Notice> {
        self.notice.as_deref().and_then(Notice::from_code)
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in / sign-up form template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/form.html")]
pub struct AuthFormTemplate {
    pub signup: bool,
    pub email: String,
    pub error: Option<String>,
    pub notice: Option<Notice>,
}

/// Awaiting-approval template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/pending.html")]
pub struct PendingTemplate {
    pub email: String,
    pub is_admin: bool,
    pub notice: Option<Notice>,
}

impl PendingTemplate {
    fn for_session(ctx: &SessionContext, notice: Option<Notice>) -> Self {
        Self {
            email: ctx.email().map(ToString::to_string).unwrap_or_default(),
            is_admin: ctx.profile().is_some_and(|p| p.is_admin),
            notice,
        }
    }
}

fn form_error(signup: bool, email: &str, error: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        AuthFormTemplate {
            signup,
            email: email.trim().to_string(),
            error: Some(error),
            notice: None,
        },
    )
        .into_response()
}

/// Where a freshly signed-in user lands: the listing once approved,
/// otherwise the pending screen.
fn landing(ctx: &SessionContext, notice: Notice) -> Redirect {
    let path = match ctx.access().auth() {
        AuthView::Redirect(route) => route.path(),
        AuthView::Form | AuthView::Pending => Route::Auth.path(),
    };
    Redirect::to(&notice.on(path))
}

// =============================================================================
// Page
// =============================================================================

/// Display the auth page for the visitor's access state.
#[instrument(skip(ctx, query), fields(access = ?ctx.access()))]
pub async fn page(ctx: SessionContext, Query(query): Query<AuthPageQuery>) -> Response {
    match ctx.access().auth() {
        AuthView::Redirect(route) => Redirect::to(route.path()).into_response(),
        AuthView::Pending => PendingTemplate::for_session(&ctx, query.notice()).into_response(),
        AuthView::Form => AuthFormTemplate {
            signup: query.is_signup(),
            email: String::new(),
            error: None,
            notice: query.notice(),
        }
        .into_response(),
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Handle sign-in form submission.
#[instrument(skip(state, session, form), fields(email = %form.email.trim()))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let email = match form.validate() {
        Ok(email) => email,
        Err(message) => return form_error(false, &form.email, message),
    };

    let provider = SessionProvider::new(state.supabase(), &session);
    match provider.sign_in(&email, &form.password).await {
        Ok(ctx) => {
            tracing::info!(access = ?ctx.access(), "User signed in");
            landing(&ctx, Notice::SignedIn).into_response()
        }
        Err(e) => {
            log_auth_failure("Sign-in failed", &e);
            form_error(false, email.as_str(), e.user_message())
        }
    }
}

/// Handle sign-up form submission.
///
/// New accounts start out pending. When the auth provider requires email
/// confirmation there is no session yet, so the visitor goes back to the
/// sign-in form with a reminder.
#[instrument(skip(state, session, form), fields(email = %form.email.trim()))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let email = match form.validate() {
        Ok(email) => email,
        Err(message) => return form_error(true, &form.email, message),
    };

    let provider = SessionProvider::new(state.supabase(), &session);
    match provider.sign_up(&email, &form.password).await {
        Ok(SignUpOutcome::SignedIn(ctx)) => {
            tracing::info!("Account created");
            landing(&ctx, Notice::AccountCreated).into_response()
        }
        Ok(SignUpOutcome::ConfirmationRequired) => {
            tracing::info!("Account created, awaiting email confirmation");
            Redirect::to(&Notice::ConfirmEmail.on(Route::Auth.path())).into_response()
        }
        Err(e) => {
            log_auth_failure("Sign-up failed", &e);
            form_error(true, email.as_str(), e.user_message())
        }
    }
}

/// Re-fetch the profile so a newly approved user can get in without
/// signing out and back in.
#[instrument(skip(state, session))]
pub async fn refresh_status(State(state): State<AppState>, session: Session) -> Redirect {
    let provider = SessionProvider::new(state.supabase(), &session);
    match provider.refresh_profile().await {
        Ok(ctx) => match ctx.access().auth() {
            AuthView::Redirect(route) => Redirect::to(&Notice::SignedIn.on(route.path())),
            AuthView::Pending => Redirect::to(&Notice::StillPending.on(Route::Auth.path())),
            AuthView::Form => Redirect::to(Route::Auth.path()),
        },
        Err(AuthError::SessionExpired) => Redirect::to(Route::Auth.path()),
        Err(e) => {
            log_auth_failure("Status check failed", &e);
            Redirect::to(&Notice::StatusCheckFailed.on(Route::Auth.path()))
        }
    }
}

/// Sign out and return to the listing.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    SessionProvider::new(state.supabase(), &session)
        .sign_out()
        .await;
    Redirect::to(&Notice::SignedOut.on(Route::Listing.path()))
}

/// User mistakes are routine; only transport and session failures are
/// worth a warning.
fn log_auth_failure(what: &str, err: &AuthError) {
    match err {
        AuthError::Transport(_) | AuthError::Session(_) => {
            tracing::warn!(error = %err, "{what}");
        }
        _ => tracing::debug!(error = %err, "{what}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_email() {
        let form = CredentialsForm {
            email: "nobody".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_validate_requires_password() {
        let form = CredentialsForm {
            email: "a@example.com".to_string(),
            password: String::new(),
        };
        assert_eq!(form.validate(), Err("Password is required".to_string()));
    }

    #[test]
    fn test_validate_normalizes_email() {
        let form = CredentialsForm {
            email: "  Ada@Example.COM ".to_string(),
            password: "hunter22".to_string(),
        };
        assert_eq!(form.validate().map(|e| e.to_string()), Ok("ada@example.com".to_string()));
    }

    #[test]
    fn test_debug_redacts_password() {
        let form = CredentialsForm {
            email: "a@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(!format!("{form:?}").contains("hunter22"));
    }

    #[test]
    fn test_signup_mode() {
        let query = AuthPageQuery {
            mode: Some("signup".to_string()),
            notice: Some("confirm_email".to_string()),
        };
        assert!(query.is_signup());
        assert_eq!(query.notice(), Some(Notice::ConfirmEmail));
        assert!(!AuthPageQuery::default().is_signup());
    }
}
