//! Access states and the view decisions derived from them.
//!
//! Every page starts by working out where the visitor stands: signed out,
//! signed in but waiting for approval, approved, or approved admin. The
//! listing, auth and admin views then ask the state what to show instead of
//! re-checking session and profile flags themselves.
//!
//! ```
//! use webapps_gallery_core::{AccessEvent, AccessState, ListingView, ProfileFlags, Route};
//!
//! let state = AccessState::Anonymous.transition(AccessEvent::SignedUp);
//! assert_eq!(state.listing(), ListingView::Redirect(Route::Auth));
//!
//! let approved = ProfileFlags { is_approved: true, is_admin: false };
//! let state = state.transition(AccessEvent::ProfileRefreshed(approved));
//! assert_eq!(state.listing(), ListingView::Full);
//! ```

use super::profile::Profile;

/// How many apps a visitor without an approved account gets to see.
pub const TEASER_LIMIT: usize = 3;

/// The flags of a profile that matter for access decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileFlags {
    pub is_approved: bool,
    pub is_admin: bool,
}

impl From<&Profile> for ProfileFlags {
    fn from(profile: &Profile) -> Self {
        Self {
            is_approved: profile.is_approved,
            is_admin: profile.is_admin,
        }
    }
}

/// Where a visitor stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessState {
    /// No session.
    Anonymous,
    /// Signed in, profile missing or not approved (also covers rejected users).
    AuthenticatedPending,
    /// Signed in and approved.
    AuthenticatedApproved,
    /// Signed in, approved and flagged admin.
    AuthenticatedAdmin,
}

/// Something that happened to the session or profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessEvent {
    SignedIn(ProfileFlags),
    /// Sign-up always lands in the pending state.
    SignedUp,
    SignedOut,
    ProfileRefreshed(ProfileFlags),
    /// An admin changed this user's approval.
    ///
    /// Carries no admin flag, and a pending state does not remember one, so
    /// approving a pending admin yields `AuthenticatedApproved`. When the
    /// whole profile is at hand, use `ProfileRefreshed` instead.
    ApprovalSet(bool),
}

/// The three pages of the gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Listing,
    Auth,
    Admin,
}

impl Route {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Listing => "/",
            Self::Auth => "/auth",
            Self::Admin => "/admin",
        }
    }
}

/// What the listing page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingView {
    /// The first [`TEASER_LIMIT`] apps and a call to log in.
    Teaser,
    Full,
    Redirect(Route),
}

/// What the auth page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthView {
    Form,
    /// The holding screen for unapproved accounts.
    Pending,
    Redirect(Route),
}

/// What the admin page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminView {
    Panel,
    Redirect(Route),
}

impl AccessState {
    /// Derive the state from the session and its profile.
    ///
    /// A session without a profile row counts as pending. Approval gates
    /// everything, so an unapproved admin is still pending.
    #[must_use]
    pub fn derive(authenticated: bool, profile: Option<&Profile>) -> Self {
        if !authenticated {
            return Self::Anonymous;
        }
        Self::from_flags(profile.map(ProfileFlags::from).unwrap_or_default())
    }

    const fn from_flags(flags: ProfileFlags) -> Self {
        match (flags.is_approved, flags.is_admin) {
            (false, _) => Self::AuthenticatedPending,
            (true, false) => Self::AuthenticatedApproved,
            (true, true) => Self::AuthenticatedAdmin,
        }
    }

    /// Apply an event and return the next state.
    #[must_use]
    pub const fn transition(self, event: AccessEvent) -> Self {
        match (self, event) {
            (_, AccessEvent::SignedOut) => Self::Anonymous,
            (_, AccessEvent::SignedUp) => Self::AuthenticatedPending,
            (_, AccessEvent::SignedIn(flags)) => Self::from_flags(flags),
            // Profile events only mean something for a signed-in user.
            (Self::Anonymous, AccessEvent::ProfileRefreshed(_) | AccessEvent::ApprovalSet(_)) => {
                Self::Anonymous
            }
            (_, AccessEvent::ProfileRefreshed(flags)) => Self::from_flags(flags),
            (Self::AuthenticatedAdmin, AccessEvent::ApprovalSet(true)) => Self::AuthenticatedAdmin,
            (_, AccessEvent::ApprovalSet(true)) => Self::AuthenticatedApproved,
            (_, AccessEvent::ApprovalSet(false)) => Self::AuthenticatedPending,
        }
    }

    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::AuthenticatedApproved | Self::AuthenticatedAdmin)
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::AuthenticatedAdmin)
    }

    #[must_use]
    pub const fn listing(self) -> ListingView {
        match self {
            Self::Anonymous => ListingView::Teaser,
            Self::AuthenticatedPending => ListingView::Redirect(Route::Auth),
            Self::AuthenticatedApproved | Self::AuthenticatedAdmin => ListingView::Full,
        }
    }

    #[must_use]
    pub const fn auth(self) -> AuthView {
        match self {
            Self::Anonymous => AuthView::Form,
            Self::AuthenticatedPending => AuthView::Pending,
            Self::AuthenticatedApproved | Self::AuthenticatedAdmin => {
                AuthView::Redirect(Route::Listing)
            }
        }
    }

    #[must_use]
    pub const fn admin(self) -> AdminView {
        match self {
            Self::AuthenticatedAdmin => AdminView::Panel,
            _ => AdminView::Redirect(Route::Auth),
        }
    }

    /// Maximum number of apps the listing may show, `None` for all.
    #[must_use]
    pub const fn app_limit(self) -> Option<usize> {
        if self.is_approved() {
            None
        } else {
            Some(TEASER_LIMIT)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{Email, UserId};

    const ALL: [AccessState; 4] = [
        AccessState::Anonymous,
        AccessState::AuthenticatedPending,
        AccessState::AuthenticatedApproved,
        AccessState::AuthenticatedAdmin,
    ];

    fn all_flags() -> impl Iterator<Item = ProfileFlags> {
        [false, true].into_iter().flat_map(|is_approved| {
            [false, true].into_iter().map(move |is_admin| ProfileFlags {
                is_approved,
                is_admin,
            })
        })
    }

    fn profile(flags: ProfileFlags) -> Profile {
        Profile {
            id: UserId::random(),
            email: Email::parse("someone@example.com").unwrap(),
            is_admin: flags.is_admin,
            is_approved: flags.is_approved,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_derive() {
        assert_eq!(AccessState::derive(false, None), AccessState::Anonymous);
        assert_eq!(
            AccessState::derive(true, None),
            AccessState::AuthenticatedPending
        );

        let admin_unapproved = profile(ProfileFlags {
            is_approved: false,
            is_admin: true,
        });
        assert_eq!(
            AccessState::derive(true, Some(&admin_unapproved)),
            AccessState::AuthenticatedPending
        );

        let approved = profile(ProfileFlags {
            is_approved: true,
            is_admin: false,
        });
        assert_eq!(
            AccessState::derive(true, Some(&approved)),
            AccessState::AuthenticatedApproved
        );
        // A stale profile without a session is still anonymous.
        assert_eq!(
            AccessState::derive(false, Some(&approved)),
            AccessState::Anonymous
        );
    }

    #[test]
    fn test_unapproved_never_sees_more_than_teaser_or_admin() {
        for flags in all_flags().filter(|f| !f.is_approved) {
            for authenticated in [false, true] {
                let state = AccessState::derive(authenticated, Some(&profile(flags)));
                assert_ne!(state.listing(), ListingView::Full, "{flags:?}");
                assert_eq!(state.app_limit(), Some(TEASER_LIMIT));
                assert_eq!(state.admin(), AdminView::Redirect(Route::Auth));
            }
        }
    }

    #[test]
    fn test_non_admin_is_sent_to_auth() {
        for flags in all_flags().filter(|f| !f.is_admin) {
            let state = AccessState::derive(true, Some(&profile(flags)));
            assert_eq!(state.admin(), AdminView::Redirect(Route::Auth));
        }
        assert_eq!(
            AccessState::Anonymous.admin(),
            AdminView::Redirect(Route::Auth)
        );
    }

    #[test]
    fn test_only_approved_admin_gets_panel() {
        for state in ALL {
            assert_eq!(
                state.admin() == AdminView::Panel,
                state == AccessState::AuthenticatedAdmin
            );
        }
    }

    #[test]
    fn test_auth_view() {
        assert_eq!(AccessState::Anonymous.auth(), AuthView::Form);
        assert_eq!(AccessState::AuthenticatedPending.auth(), AuthView::Pending);
        assert_eq!(
            AccessState::AuthenticatedApproved.auth(),
            AuthView::Redirect(Route::Listing)
        );
        assert_eq!(
            AccessState::AuthenticatedAdmin.auth(),
            AuthView::Redirect(Route::Listing)
        );
    }

    #[test]
    fn test_sign_out_and_sign_up_from_anywhere() {
        for state in ALL {
            assert_eq!(
                state.transition(AccessEvent::SignedOut),
                AccessState::Anonymous
            );
            assert_eq!(
                state.transition(AccessEvent::SignedUp),
                AccessState::AuthenticatedPending
            );
        }
    }

    #[test]
    fn test_sign_in_matches_derive() {
        for flags in all_flags() {
            assert_eq!(
                AccessState::Anonymous.transition(AccessEvent::SignedIn(flags)),
                AccessState::derive(true, Some(&profile(flags)))
            );
        }
    }

    #[test]
    fn test_profile_events_ignored_when_anonymous() {
        let approved = ProfileFlags {
            is_approved: true,
            is_admin: true,
        };
        assert_eq!(
            AccessState::Anonymous.transition(AccessEvent::ProfileRefreshed(approved)),
            AccessState::Anonymous
        );
        assert_eq!(
            AccessState::Anonymous.transition(AccessEvent::ApprovalSet(true)),
            AccessState::Anonymous
        );
    }

    #[test]
    fn test_approval_round_trip() {
        let approved = AccessState::AuthenticatedPending.transition(AccessEvent::ApprovalSet(true));
        assert_eq!(approved, AccessState::AuthenticatedApproved);
        assert_eq!(approved.listing(), ListingView::Full);

        let rejected = approved.transition(AccessEvent::ApprovalSet(false));
        assert_eq!(rejected, AccessState::AuthenticatedPending);
        assert_eq!(rejected.listing(), ListingView::Redirect(Route::Auth));

        assert_eq!(
            AccessState::AuthenticatedAdmin.transition(AccessEvent::ApprovalSet(true)),
            AccessState::AuthenticatedAdmin
        );
    }

    #[test]
    fn test_profile_refresh_matches_derive() {
        for before in ALL.into_iter().filter(|s| s.is_authenticated()) {
            for flags in all_flags() {
                assert_eq!(
                    before.transition(AccessEvent::ProfileRefreshed(flags)),
                    AccessState::derive(true, Some(&profile(flags))),
                    "{before:?} refreshed with {flags:?}"
                );
            }
        }
    }

    #[test]
    fn test_approval_matches_derive_for_non_admins() {
        for was_approved in [false, true] {
            for approved in [false, true] {
                let old = ProfileFlags {
                    is_approved: was_approved,
                    is_admin: false,
                };
                let new = ProfileFlags {
                    is_approved: approved,
                    is_admin: false,
                };
                let before = AccessState::derive(true, Some(&profile(old)));
                assert_eq!(
                    before.transition(AccessEvent::ApprovalSet(approved)),
                    AccessState::derive(true, Some(&profile(new)))
                );
            }
        }
    }

    #[test]
    fn test_approval_of_pending_admin_needs_full_profile() {
        let admin = ProfileFlags {
            is_approved: true,
            is_admin: true,
        };
        let pending = AccessState::AuthenticatedPending;

        // The event alone cannot know about the admin flag
        assert_eq!(
            pending.transition(AccessEvent::ApprovalSet(true)),
            AccessState::AuthenticatedApproved
        );
        assert_eq!(
            pending.transition(AccessEvent::ProfileRefreshed(admin)),
            AccessState::derive(true, Some(&profile(admin)))
        );
        assert_eq!(
            pending.transition(AccessEvent::ProfileRefreshed(admin)),
            AccessState::AuthenticatedAdmin
        );
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Listing.path(), "/");
        assert_eq!(Route::Auth.path(), "/auth");
        assert_eq!(Route::Admin.path(), "/admin");
    }
}
