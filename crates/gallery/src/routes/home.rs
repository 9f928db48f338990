//! App listing route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;
use webapps_gallery_core::{App, ListingView};

use crate::filters;
use crate::models::{Notice, NoticeQuery};
use crate::services::SessionContext;
use crate::state::AppState;

/// Listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub apps: Vec<App>,
    /// Signed-out and unapproved visitors see a short preview plus a call to sign in.
    pub teaser: bool,
    pub signed_in: bool,
    pub is_admin: bool,
    pub email: String,
    pub notice: Option<Notice>,
    pub load_error: Option<String>,
}

/// Display the app listing.
///
/// Approved users get the whole catalog; everyone else gets the newest few.
#[instrument(skip(state, ctx, query), fields(access = ?ctx.access()))]
pub async fn index(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(query): Query<NoticeQuery>,
) -> Response {
    let access = ctx.access();
    let teaser = match access.listing() {
        ListingView::Redirect(route) => return Redirect::to(route.path()).into_response(),
        ListingView::Teaser => true,
        ListingView::Full => false,
    };

    let limit = access.app_limit();
    let (mut apps, load_error) = match state
        .supabase()
        .list_apps(ctx.access_token(), limit)
        .await
    {
        Ok(apps) => (apps, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load apps");
            (Vec::new(), Some(e.user_message()))
        }
    };
    if let Some(limit) = limit {
        apps.truncate(limit);
    }

    IndexTemplate {
        apps,
        teaser,
        signed_in: access.is_authenticated(),
        is_admin: access.is_admin(),
        email: ctx.email().map(ToString::to_string).unwrap_or_default(),
        notice: query.notice(),
        load_error,
    }
    .into_response()
}
