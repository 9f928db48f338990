//! Auth provider (GoTrue) calls.

use reqwest::Method;
use serde::Serialize;
use tracing::instrument;
use webapps_gallery_core::Email;

use super::types::{AuthSession, SignUpResponse};
use super::{AuthError, QueryError, SupabaseClient};

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshTokenGrant<'a> {
    refresh_token: &'a str,
}

impl SupabaseClient {
    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong email/password pair,
    /// or another `AuthError` if the provider rejects or fails the call.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let mut url = self.auth_url("token").map_err(AuthError::from_query)?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let request = self
            .request(Method::POST, url, None)
            .json(&PasswordCredentials {
                email: email.as_str(),
                password,
            });

        self.execute(request).await.map_err(AuthError::from_query)
    }

    /// Register a new account. The backend creates its profile row.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists`, `AuthError::WeakPassword`, etc.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<SignUpResponse, AuthError> {
        let url = self.auth_url("signup").map_err(AuthError::from_query)?;

        let request = self
            .request(Method::POST, url, None)
            .json(&PasswordCredentials {
                email: email.as_str(),
                password,
            });

        self.execute(request).await.map_err(AuthError::from_query)
    }

    /// Trade a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` when the refresh token is no longer valid.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let mut url = self.auth_url("token").map_err(AuthError::from_query)?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");

        let request = self
            .request(Method::POST, url, None)
            .json(&RefreshTokenGrant { refresh_token });

        self.execute(request).await.map_err(AuthError::from_query)
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` if the provider rejects or fails the call.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.auth_url("logout").map_err(AuthError::from_query)?;

        self.send(self.request(Method::POST, url, Some(access_token)))
            .await
            .map(|_| ())
            .map_err(AuthError::from_query)
    }

    /// Check that the auth provider answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<(), QueryError> {
        let url = self.auth_url("health")?;
        self.send(self.request(Method::GET, url, None)).await.map(|_| ())
    }
}
