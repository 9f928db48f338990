//! One-shot notices shown after a redirect.
//!
//! A successful form post redirects (post/redirect/get) and carries a
//! `?notice=` code; the next page renders the matching banner.

use serde::Deserialize;

/// Outcome messages, identified by a stable code in the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SignedIn,
    AccountCreated,
    ConfirmEmail,
    SignedOut,
    StillPending,
    StatusCheckFailed,
    AppCreated,
    AppUpdated,
    AppDeleted,
    AppDeleteFailed,
    UserApproved,
    UserRejected,
    UserUpdateFailed,
}

impl Notice {
    const ALL: [Self; 13] = [
        Self::SignedIn,
        Self::AccountCreated,
        Self::ConfirmEmail,
        Self::SignedOut,
        Self::StillPending,
        Self::StatusCheckFailed,
        Self::AppCreated,
        Self::AppUpdated,
        Self::AppDeleted,
        Self::AppDeleteFailed,
        Self::UserApproved,
        Self::UserRejected,
        Self::UserUpdateFailed,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SignedIn => "signed_in",
            Self::AccountCreated => "account_created",
            Self::ConfirmEmail => "confirm_email",
            Self::SignedOut => "signed_out",
            Self::StillPending => "still_pending",
            Self::StatusCheckFailed => "status_check_failed",
            Self::AppCreated => "app_created",
            Self::AppUpdated => "app_updated",
            Self::AppDeleted => "app_deleted",
            Self::AppDeleteFailed => "app_delete_failed",
            Self::UserApproved => "user_approved",
            Self::UserRejected => "user_rejected",
            Self::UserUpdateFailed => "user_update_failed",
        }
    }

    /// Look a notice up by code. Unknown codes are ignored, not rejected.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.code() == code)
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::SignedIn => "Signed in successfully.",
            Self::AccountCreated => "Account created! Wait for an administrator to approve it.",
            Self::ConfirmEmail => {
                "Account created! Confirm your email address, then sign in to await approval."
            }
            Self::SignedOut => "You have been signed out.",
            Self::StillPending => "Your account is still awaiting approval.",
            Self::StatusCheckFailed => "Could not check your account status. Please try again.",
            Self::AppCreated => "App created.",
            Self::AppUpdated => "App updated.",
            Self::AppDeleted => "App deleted.",
            Self::AppDeleteFailed => "The app could not be deleted.",
            Self::UserApproved => "User approved.",
            Self::UserRejected => "User rejected.",
            Self::UserUpdateFailed => "The user could not be updated.",
        }
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::StatusCheckFailed | Self::AppDeleteFailed | Self::UserUpdateFailed
        )
    }

    /// Append this notice to a local path.
    #[must_use]
    pub fn on(self, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{path}{separator}notice={}", self.code())
    }
}

/// The `?notice=` part of a query string.
///
/// Kept as a raw string so a stale or hand-edited code cannot fail the
/// whole request.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    #[serde(default)]
    pub notice: Option<String>,
}

impl NoticeQuery {
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        self.notice.as_deref().and_then(Notice::from_code)
    }
}
