//! WebApps Gallery server library.
//!
//! A curated gallery of web applications. Anonymous visitors see a short
//! preview; signed-up users wait for an administrator to approve them and
//! then see the whole catalog; approved admins manage apps and users.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for server-side rendering
//! - Hosted backend (Supabase) for auth and data, over its HTTP APIs
//! - `PostgreSQL`-backed tower-sessions for server-side session storage
//! - Sentry and `tracing` for error tracking and structured logs
//!
//! The binary in `main.rs` wires configuration, logging and the session
//! store around [`app`]; integration tests do the same with an in-memory
//! session store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod supabase;

use axum::{Router, extract::State, http::StatusCode, middleware::from_fn, routing::get};
use tower_http::{
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Directory the `/static` route serves from, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/gallery/static";

/// Build the gallery router with its state applied.
///
/// The session layer is left to the caller so the binary and the tests can
/// choose their own session store. Handlers read the session through the
/// request extensions, so it must wrap this router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(state.config().trust_proxy_headers))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        #[allow(clippy::cast_possible_truncation)]
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the auth and data backend answers before returning OK.
/// Returns 503 Service Unavailable if it does not.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.supabase().health().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
