//! HTTP middleware stack for the gallery.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. Session layer (tower-sessions)
//! 3. `TraceLayer` (request span with status and latency)
//! 4. Request ID (add unique ID to each request)
//! 5. Security headers (CSP, frame options, etc.)
//! 6. Rate limiting on auth form posts (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{AdminRejection, RequireAdmin};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
