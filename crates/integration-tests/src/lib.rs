//! Integration tests for WebApps Gallery.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p webapps-gallery-integration-tests
//! ```
//!
//! No database or network access is needed: every test starts a
//! [`FakeBackend`] and a gallery server with an in-memory session store, both
//! on ephemeral local ports, and drives them with a cookie-keeping HTTP client
//! that does not follow redirects.
//!
//! # Test Categories
//!
//! - `listing` - Teaser and full catalog, health checks
//! - `auth` - Sign-in, sign-up, pending approval, sign-out
//! - `admin` - Admin panel access, app and user management

pub mod fake_backend;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use reqwest::{Client, Response, header::LOCATION, redirect::Policy};
use secrecy::SecretString;
use tower_sessions::MemoryStore;
use webapps_gallery::config::{GalleryConfig, SupabaseConfig};
use webapps_gallery::middleware::create_session_layer;
use webapps_gallery::state::AppState;

pub use fake_backend::{ANON_KEY, FakeBackend, SERVICE_KEY};

/// Password used for every seeded test user.
pub const PASSWORD: &str = "correct-horse-battery";

/// A running gallery wired to a fake backend, plus a browser-like client.
pub struct TestContext {
    pub backend: FakeBackend,
    pub base_url: String,
    pub client: Client,
}

impl TestContext {
    /// Start a fake backend and a gallery server in front of it.
    ///
    /// # Panics
    ///
    /// Panics if a server cannot be started.
    #[allow(clippy::expect_used)]
    pub async fn new() -> Self {
        let backend = FakeBackend::start().await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind gallery");
        let addr = listener.local_addr().expect("Gallery has no address");
        let base_url = format!("http://{addr}");

        let config = GalleryConfig {
            database_url: SecretString::from("postgres://unused"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: addr.port(),
            base_url: base_url.clone(),
            supabase: SupabaseConfig {
                url: backend.url().clone(),
                api_key: SecretString::from(ANON_KEY),
                timeout: Duration::from_secs(5),
            },
            trust_proxy_headers: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };

        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(config).expect("Failed to build app state");
        let app = webapps_gallery::app(state).layer(session_layer);

        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });

        Self {
            backend,
            base_url,
            client: browser(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A second, independent browser (own cookie jar).
    #[must_use]
    pub fn new_browser(&self) -> Client {
        browser()
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    #[allow(clippy::expect_used)]
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    #[allow(clippy::expect_used)]
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Sign in with the seeded [`PASSWORD`].
    pub async fn sign_in(&self, email: &str) -> Response {
        self.post_form("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await
    }

    /// Seed an approved admin and sign in as them.
    pub async fn sign_in_admin(&self) -> webapps_gallery_core::UserId {
        let id = self
            .backend
            .add_user("admin@example.com", PASSWORD, true, true);
        let response = self.sign_in("admin@example.com").await;
        assert_eq!(location(&response), "/?notice=signed_in");
        id
    }

    /// GET a page and return its body.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read.
    #[allow(clippy::expect_used)]
    pub async fn page(&self, path: &str) -> String {
        self.get(path).await.text().await.expect("Body unreadable")
    }
}

#[allow(clippy::expect_used)]
fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to build HTTP client")
}

/// The `Location` header of a redirect, or an empty string.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Number of gallery cards on a listing page.
#[must_use]
pub fn card_count(body: &str) -> usize {
    body.matches("data-app-id=").count()
}
