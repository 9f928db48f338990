//! WebApps Gallery Core - Shared types library.
//!
//! This crate provides the types used across all gallery components:
//! - `gallery` - The web server (listing, auth and admin views)
//! - `cli` - Command-line tools for migrations, approvals and seeding
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Whether a visitor sees the teaser, the full
//! listing, the pending screen or the admin panel is decided here, by
//! [`AccessState`], so the rules can be tested without a server.
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, app records, profiles, the admin form and access states

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

#[doc(hidden)]
pub use uuid;
