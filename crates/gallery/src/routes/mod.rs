//! HTTP route handlers for the gallery.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - App listing (teaser or full catalog)
//!
//! # Auth
//! GET  /auth                          - Sign-in form, sign-up form (?mode=signup) or pending screen
//! POST /auth/login                    - Sign in (rate limited)
//! POST /auth/signup                   - Create account (rate limited)
//! POST /auth/refresh                  - Re-check approval status
//! POST /auth/logout                   - Sign out
//!
//! # Admin (approved admins only)
//! GET  /admin                         - Admin panel (?tab=apps|users, ?form=new, ?edit={id})
//! POST /admin/apps                    - Create or update an app
//! GET  /admin/apps/{id}/delete        - Delete confirmation
//! POST /admin/apps/{id}/delete        - Delete an app
//! POST /admin/users/{id}/approve      - Approve a user
//! POST /admin/users/{id}/reject       - Reject a user
//! ```

pub mod admin;
pub mod auth;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Credential posts sit behind the rate limiter; the status check and
/// sign-out do not.
pub fn auth_routes(trust_proxy_headers: bool) -> Router<AppState> {
    let credential_posts = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .route_layer(auth_rate_limiter(trust_proxy_headers));

    Router::new()
        .route("/auth", get(auth::page))
        .route("/auth/refresh", post(auth::refresh_status))
        .route("/auth/logout", post(auth::logout))
        .merge(credential_posts)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin::index))
        .route("/admin/apps", post(admin::apps::save))
        .route(
            "/admin/apps/{id}/delete",
            get(admin::apps::confirm_delete).post(admin::apps::delete),
        )
        .route("/admin/users/{id}/approve", post(admin::users::approve))
        .route("/admin/users/{id}/reject", post(admin::users::reject))
}

/// Create all routes for the gallery.
pub fn routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .merge(auth_routes(trust_proxy_headers))
        .merge(admin_routes())
}
