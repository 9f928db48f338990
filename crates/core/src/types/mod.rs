//! Core types for the gallery.
//!
//! This module provides type-safe wrappers for the gallery's domain concepts.

pub mod access;
pub mod app;
pub mod email;
pub mod id;
pub mod profile;

pub use access::{
    AccessEvent, AccessState, AdminView, AuthView, ListingView, ProfileFlags, Route, TEASER_LIMIT,
};
pub use app::{App, AppDraft, AppField, AppForm, AppFormError, Submission};
pub use email::{Email, EmailError};
pub use id::*;
pub use profile::Profile;
