//! Session provider: who is signed in, and what their profile allows.
//!
//! Wraps the auth provider and the server-side session. Every request loads
//! a [`SessionContext`] through [`SessionProvider::load`]; the auth routes use
//! the sign-in, sign-up, sign-out and refresh operations.

use tower_sessions::Session;
use tracing::instrument;
use webapps_gallery_core::{AccessEvent, AccessState, Email, Profile, ProfileFlags};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentSession, keys};
use crate::supabase::{AuthError, AuthSession, QueryError, SignUpResponse, SupabaseClient};

/// The signed-in identity (if any) and the access state derived from it.
///
/// Handed to every view so none of them re-reads the session on its own.
#[derive(Debug, Clone)]
pub struct SessionContext {
    current: Option<CurrentSession>,
    access: AccessState,
}

impl SessionContext {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            current: None,
            access: AccessState::Anonymous,
        }
    }

    #[must_use]
    pub fn new(current: Option<CurrentSession>) -> Self {
        let access = AccessState::derive(
            current.is_some(),
            current.as_ref().and_then(|c| c.profile.as_ref()),
        );
        Self { current, access }
    }

    #[must_use]
    pub const fn access(&self) -> AccessState {
        self.access
    }

    #[must_use]
    pub const fn current(&self) -> Option<&CurrentSession> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.current.as_ref().and_then(|c| c.profile.as_ref())
    }

    #[must_use]
    pub fn email(&self) -> Option<&Email> {
        self.current.as_ref().map(|c| &c.email)
    }

    /// Bearer token for backend calls made on the user's behalf.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.current.as_ref().map(CurrentSession::access_token)
    }
}

/// Result of a successful sign-up.
#[derive(Debug)]
pub enum SignUpOutcome {
    /// The backend signed the new user in straight away.
    SignedIn(SessionContext),
    /// The backend sent a confirmation email; no session yet.
    ConfirmationRequired,
}

/// Session operations for one request.
pub struct SessionProvider<'a> {
    client: &'a SupabaseClient,
    session: &'a Session,
}

impl<'a> SessionProvider<'a> {
    #[must_use]
    pub const fn new(client: &'a SupabaseClient, session: &'a Session) -> Self {
        Self { client, session }
    }

    /// Load the current session, refreshing tokens and profile as needed.
    ///
    /// Never fails. A session whose refresh token is refused is cleared and
    /// the visitor becomes anonymous. A refresh that cannot reach the
    /// provider keeps the session, and a failed profile fetch falls back to
    /// the last known profile.
    #[instrument(skip(self))]
    pub async fn load(&self) -> SessionContext {
        let mut current = match self.stored().await {
            Ok(Some(current)) => current,
            Ok(None) => return SessionContext::anonymous(),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Failed to read session, treating visitor as anonymous"
                );
                return SessionContext::anonymous();
            }
        };

        let mut changed = match self.ensure_fresh(&mut current).await {
            Ok(refreshed) => refreshed,
            Err(err) if err.ends_session() => {
                tracing::info!(
                    user_id = %current.user_id,
                    error = %err,
                    "Session no longer valid, signing out"
                );
                self.forget().await;
                return SessionContext::anonymous();
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %current.user_id,
                    error = %err,
                    "Token refresh unavailable, keeping session"
                );
                false
            }
        };

        match self.fetch_profile(&current).await {
            Ok(profile) => {
                if profile != current.profile {
                    log_access_change(&current, profile.as_ref());
                    current.profile = profile;
                    changed = true;
                }
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %current.user_id,
                    error = %err,
                    "Profile fetch failed, using last known profile"
                );
            }
        }

        if changed && let Err(err) = self.store(&current).await {
            tracing::warn!(error = %err, "Failed to persist refreshed session");
        }

        SessionContext::new(Some(current))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthError` (bad credentials, unconfirmed
    /// email, ...) or `AuthError::Session` if the session cannot be saved.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<SessionContext, AuthError> {
        let auth = self.client.sign_in_with_password(email, password).await?;
        self.establish(auth, email).await
    }

    /// Create an account. The backend creates an unapproved, non-admin profile.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthError` (duplicate email, weak password, ...)
    /// or `AuthError::Session` if the session cannot be saved.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        match self.client.sign_up(email, password).await? {
            SignUpResponse::Session(auth) => {
                Ok(SignUpOutcome::SignedIn(self.establish(auth, email).await?))
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Sign-up awaiting email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
        }
    }

    /// Sign out: revoke the backend session (best effort) and drop ours.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        if let Ok(Some(current)) = self.stored().await
            && let Err(err) = self.client.sign_out(current.access_token()).await
        {
            tracing::debug!(error = %err, "Backend sign-out failed, clearing local session anyway");
        }
        self.forget().await;
    }

    /// Re-fetch the profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` when nobody is signed in or the
    /// session cannot be refreshed, `AuthError::Transport` when the profile
    /// cannot be fetched.
    #[instrument(skip(self))]
    pub async fn refresh_profile(&self) -> Result<SessionContext, AuthError> {
        let Some(mut current) = self.stored().await.map_err(session_error)? else {
            return Err(AuthError::SessionExpired);
        };

        if let Err(err) = self.ensure_fresh(&mut current).await {
            if err.ends_session() {
                self.forget().await;
            }
            return Err(err);
        }

        let profile = self
            .fetch_profile(&current)
            .await
            .map_err(AuthError::Transport)?;
        log_access_change(&current, profile.as_ref());
        current.profile = profile;
        self.store(&current).await.map_err(session_error)?;

        Ok(SessionContext::new(Some(current)))
    }

    async fn establish(
        &self,
        auth: AuthSession,
        email: &Email,
    ) -> Result<SessionContext, AuthError> {
        let mut current = CurrentSession::from_auth(auth, email, now());

        match self.fetch_profile(&current).await {
            Ok(profile) => current.profile = profile,
            Err(err) => {
                tracing::warn!(
                    user_id = %current.user_id,
                    error = %err,
                    "Profile fetch after sign-in failed"
                );
            }
        }

        // New identity, new session id
        self.session.cycle_id().await.map_err(session_error)?;
        self.store(&current).await.map_err(session_error)?;

        set_sentry_user(&current.user_id, Some(current.email.as_str()));
        tracing::info!(user_id = %current.user_id, "User signed in");

        Ok(SessionContext::new(Some(current)))
    }

    /// Refresh the token pair if the access token has expired.
    async fn ensure_fresh(&self, current: &mut CurrentSession) -> Result<bool, AuthError> {
        if !current.is_expired(now()) {
            return Ok(false);
        }
        let auth = self.client.refresh_session(current.refresh_token()).await?;
        current.replace_tokens(auth, now());
        tracing::debug!(user_id = %current.user_id, "Access token refreshed");
        Ok(true)
    }

    async fn fetch_profile(&self, current: &CurrentSession) -> Result<Option<Profile>, QueryError> {
        self.client
            .get_profile(Some(current.access_token()), current.user_id)
            .await
    }

    async fn stored(&self) -> Result<Option<CurrentSession>, tower_sessions::session::Error> {
        self.session.get(keys::CURRENT_SESSION).await
    }

    async fn store(&self, current: &CurrentSession) -> Result<(), tower_sessions::session::Error> {
        self.session.insert(keys::CURRENT_SESSION, current).await
    }

    async fn forget(&self) {
        if let Err(err) = self.session.flush().await {
            tracing::warn!(error = %err, "Failed to flush session");
        }
        clear_sentry_user();
    }
}

/// Log when a re-fetched profile moves the user to another access state.
fn log_access_change(current: &CurrentSession, refreshed: Option<&Profile>) {
    let before = AccessState::derive(true, current.profile.as_ref());
    let flags = refreshed.map(ProfileFlags::from).unwrap_or_default();
    let after = before.transition(AccessEvent::ProfileRefreshed(flags));
    if after != before {
        tracing::info!(
            user_id = %current.user_id,
            from = ?before,
            to = ?after,
            "Access state changed"
        );
    }
}

fn session_error(err: tower_sessions::session::Error) -> AuthError {
    AuthError::Session(err.to_string())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
