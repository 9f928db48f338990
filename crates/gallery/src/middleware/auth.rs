//! Session extractors.
//!
//! [`SessionContext`] is the application context every view receives;
//! [`RequireAdmin`] additionally turns away anyone who is not an approved admin.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use webapps_gallery_core::{AdminView, Route};

use crate::services::{SessionContext, SessionProvider};
use crate::state::AppState;

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            tracing::warn!("No session layer in front of handler, treating visitor as anonymous");
            return Ok(Self::anonymous());
        };

        Ok(SessionProvider::new(state.supabase(), &session).load().await)
    }
}

/// Extractor that requires an approved admin.
///
/// Everyone else is redirected to the auth page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(ctx): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", ctx.email().map_or("admin", |e| e.as_str()))
/// }
/// ```
pub struct RequireAdmin(pub SessionContext);

/// Rejection for [`RequireAdmin`].
#[derive(Debug)]
pub struct AdminRejection(Route);

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        Redirect::to(self.0.path()).into_response()
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(ctx) = SessionContext::from_request_parts(parts, state).await;

        match ctx.access().admin() {
            AdminView::Panel => Ok(Self(ctx)),
            AdminView::Redirect(route) => {
                tracing::debug!(access = ?ctx.access(), "Admin area refused");
                Err(AdminRejection(route))
            }
        }
    }
}
