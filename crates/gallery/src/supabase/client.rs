//! Shared HTTP plumbing for the data and auth APIs.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use super::{QueryError, api_error};
use crate::config::SupabaseConfig;

/// Client for the hosted backend.
///
/// Cheap to clone; the connection pool and key live behind an `Arc`.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: Url,
    auth_url: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.inner.rest_url.as_str())
            .field("auth_url", &self.inner.auth_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the project URL
    /// cannot be extended with the API paths.
    pub fn new(config: &SupabaseConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("webapps-gallery/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base = config.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                rest_url: base.join("rest/v1/")?,
                auth_url: base.join("auth/v1/")?,
                api_key: config.api_key.clone(),
            }),
        })
    }

    pub(super) fn table_url(&self, table: &str) -> Result<Url, QueryError> {
        Ok(self.inner.rest_url.join(table)?)
    }

    pub(super) fn auth_url(&self, path: &str) -> Result<Url, QueryError> {
        Ok(self.inner.auth_url.join(path)?)
    }

    /// Start a request carrying the API key.
    ///
    /// `bearer` is the signed-in user's access token; without one the API key
    /// doubles as the bearer (anonymous role, or service role for the CLI).
    pub(super) fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let key = self.inner.api_key.expose_secret();
        self.inner
            .client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(bearer.unwrap_or(key))
    }

    /// Send a request and return the body of a successful response.
    pub(super) async fn send(&self, request: RequestBuilder) -> Result<String, QueryError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(QueryError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let snippet = body.chars().take(500).collect::<String>();
            if status.is_server_error() {
                tracing::error!(status = %status, body = %snippet, "Backend returned server error");
            } else {
                tracing::debug!(status = %status, body = %snippet, "Backend rejected request");
            }
            return Err(api_error(status, &body));
        }

        Ok(body)
    }

    /// Send a request and parse the JSON body of a successful response.
    pub(super) async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, QueryError> {
        let body = self.send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            QueryError::Parse(e)
        })
    }
}
