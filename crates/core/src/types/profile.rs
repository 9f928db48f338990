//! Per-user profile rows holding the approval and admin flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::UserId;

/// A user's profile, created by the backend when the user signs up.
///
/// Both flags start out `false`. Only an admin flips `is_approved`; there is
/// no separate "rejected" marker, so a rejected user looks exactly like one
/// nobody has reviewed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the auth identity.
    pub id: UserId,
    pub email: Email,
    pub is_admin: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Whether an admin still has to approve this user.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.is_approved
    }

    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        if self.is_approved { "Approved" } else { "Pending" }
    }

    #[must_use]
    pub const fn role_label(&self) -> &'static str {
        if self.is_admin { "Admin" } else { "User" }
    }
}
