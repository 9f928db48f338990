//! Admin user management: approve or reject sign-ups.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tracing::instrument;
use webapps_gallery_core::UserId;

use super::AdminTab;
use crate::error::add_breadcrumb;
use crate::middleware::RequireAdmin;
use crate::models::Notice;
use crate::services::SessionContext;
use crate::state::AppState;

/// Approve a user.
#[instrument(skip(ctx, state))]
pub async fn approve(
    RequireAdmin(ctx): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Redirect {
    set_approval(&state, &ctx, id, true).await
}

/// Reject a user. Rejected users stay signed up but see the pending screen.
#[instrument(skip(ctx, state))]
pub async fn reject(
    RequireAdmin(ctx): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Redirect {
    set_approval(&state, &ctx, id, false).await
}

async fn set_approval(
    state: &AppState,
    ctx: &SessionContext,
    id: UserId,
    approved: bool,
) -> Redirect {
    let notice = match state
        .supabase()
        .set_profile_approval(ctx.access_token(), id, approved)
        .await
    {
        Ok(profile) => {
            tracing::info!(user_id = %profile.id, approved, "User approval updated");
            let notice = if approved {
                Notice::UserApproved
            } else {
                Notice::UserRejected
            };
            add_breadcrumb("admin", notice.message(), &[("user_id", &profile.id.to_string())]);
            notice
        }
        Err(e) => {
            tracing::warn!(error = %e, "Updating user approval failed");
            Notice::UserUpdateFailed
        }
    };

    Redirect::to(&notice.on(&AdminTab::Users.path()))
}
