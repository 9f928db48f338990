//! In-process stand-in for the hosted backend.
//!
//! Serves the slice of the auth (`/auth/v1`) and data (`/rest/v1`) APIs the
//! gallery calls, with the same row level security rules as the real
//! migrations: anyone reads apps, only approved admins write them, users read
//! their own profile and admins read and update all profiles. State lives in
//! memory and can be inspected or changed directly from tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;
use webapps_gallery_core::{App, AppDraft, AppId, Email, Profile, UserId};

/// Public API key the gallery is configured with.
pub const ANON_KEY: &str = "anon-Kq7vT2mX9pL4wR8zN6";
/// Key that bypasses row level security.
pub const SERVICE_KEY: &str = "service-Zr5nB1cV6hJ3sD0yQ2";

struct FakeUser {
    id: UserId,
    password: String,
    confirmed: bool,
}

/// Who a data API request runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Caller {
    Service,
    Anon,
    User(UserId),
}

struct Store {
    users: HashMap<Email, FakeUser>,
    access_tokens: HashMap<String, UserId>,
    refresh_tokens: HashMap<String, UserId>,
    profiles: Vec<Profile>,
    apps: Vec<App>,
    epoch: DateTime<Utc>,
    ticks: i64,
    confirm_email: bool,
    token_lifetime: i64,
    offline: bool,
    offline_tables: HashSet<String>,
    refreshes: usize,
}

impl Store {
    fn new() -> Self {
        Self {
            users: HashMap::new(),
            access_tokens: HashMap::new(),
            refresh_tokens: HashMap::new(),
            profiles: Vec::new(),
            apps: Vec::new(),
            epoch: Utc::now() - Duration::days(1),
            ticks: 0,
            confirm_email: false,
            token_lifetime: 3600,
            offline: false,
            offline_tables: HashSet::new(),
            refreshes: 0,
        }
    }

    fn table_down(&self, table: &str) -> bool {
        self.offline || self.offline_tables.contains(table)
    }

    /// Strictly increasing timestamps, so newest-first order is stable.
    fn tick(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        self.epoch + Duration::seconds(self.ticks)
    }

    fn create_user(&mut self, email: Email, password: &str, confirmed: bool) -> UserId {
        let id = UserId::random();
        self.users.insert(
            email.clone(),
            FakeUser {
                id,
                password: password.to_string(),
                confirmed,
            },
        );
        let created_at = self.tick();
        self.profiles.push(Profile {
            id,
            email,
            is_admin: false,
            is_approved: false,
            created_at,
        });
        id
    }

    fn issue_session(&mut self, id: UserId) -> Value {
        let access_token = format!("at-{}", Uuid::new_v4());
        let refresh_token = format!("rt-{}", Uuid::new_v4());
        self.access_tokens.insert(access_token.clone(), id);
        self.refresh_tokens.insert(refresh_token.clone(), id);
        let email = self
            .profiles
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.email.to_string());

        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": self.token_lifetime,
            "refresh_token": refresh_token,
            "user": { "id": id, "email": email, "aud": "authenticated" },
        })
    }

    fn caller(&self, headers: &HeaderMap) -> Result<Caller, Response> {
        let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
        if !matches!(apikey, Some(ANON_KEY | SERVICE_KEY)) {
            return Err(rest_error(StatusCode::UNAUTHORIZED, "PGRST301", "Invalid API key"));
        }

        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match bearer {
            Some(SERVICE_KEY) => Ok(Caller::Service),
            Some(ANON_KEY) | None => Ok(Caller::Anon),
            Some(token) => self
                .access_tokens
                .get(token)
                .map(|id| Caller::User(*id))
                .ok_or_else(|| rest_error(StatusCode::UNAUTHORIZED, "PGRST301", "JWT expired")),
        }
    }

    /// The `is_admin()` policy function: an approved admin, or the service role.
    fn is_admin(&self, caller: Caller) -> bool {
        match caller {
            Caller::Service => true,
            Caller::Anon => false,
            Caller::User(id) => self
                .profiles
                .iter()
                .any(|p| p.id == id && p.is_admin && p.is_approved),
        }
    }
}

/// Handle on a running fake backend.
#[derive(Clone)]
pub struct FakeBackend {
    store: Arc<Mutex<Store>>,
    url: Url,
}

impl FakeBackend {
    /// Start the fake on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");
        let url = Url::parse(&format!("http://{addr}")).expect("Fake backend URL is valid");

        let fake = Self {
            store: Arc::new(Mutex::new(Store::new())),
            url,
        };

        let router = Router::new()
            .route("/auth/v1/health", get(health))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/logout", post(logout))
            .route(
                "/rest/v1/{table}",
                get(select).post(insert).patch(update).delete(remove),
            )
            .with_state(fake.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        fake
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Register a confirmed user with the given flags.
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    #[allow(clippy::expect_used)]
    pub fn add_user(&self, email: &str, password: &str, approved: bool, admin: bool) -> UserId {
        let email = Email::parse(email).expect("test email is valid");
        let mut store = self.lock();
        let id = store.create_user(email, password, true);
        if let Some(profile) = store.profiles.iter_mut().find(|p| p.id == id) {
            profile.is_approved = approved;
            profile.is_admin = admin;
        }
        id
    }

    /// Insert an app named `name` with derived URLs.
    pub fn add_app(&self, name: &str) -> App {
        let slug = name.to_lowercase().replace(' ', "-");
        let mut store = self.lock();
        let app = App {
            id: AppId::random(),
            name: name.to_string(),
            description: format!("{name} in your browser"),
            image: format!("https://img.example.com/{slug}.png"),
            link: format!("https://{slug}.example.com"),
            created_at: store.tick(),
        };
        store.apps.push(app.clone());
        app
    }

    /// Flip a user's approval as an admin elsewhere would.
    pub fn set_approval(&self, id: UserId, approved: bool) {
        if let Some(profile) = self.lock().profiles.iter_mut().find(|p| p.id == id) {
            profile.is_approved = approved;
        }
    }

    /// All apps, newest first.
    #[must_use]
    pub fn apps(&self) -> Vec<App> {
        let mut apps = self.lock().apps.clone();
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        apps
    }

    #[must_use]
    pub fn profile(&self, id: UserId) -> Option<Profile> {
        self.lock().profiles.iter().find(|p| p.id == id).cloned()
    }

    #[must_use]
    pub fn profile_by_email(&self, email: &str) -> Option<Profile> {
        let email = Email::parse(email).ok()?;
        self.lock()
            .profiles
            .iter()
            .find(|p| p.email == email)
            .cloned()
    }

    /// Require email confirmation: sign-up then returns no session.
    pub fn set_confirm_email(&self, required: bool) {
        self.lock().confirm_email = required;
    }

    /// Lifetime in seconds of access tokens issued from now on.
    pub fn set_token_lifetime(&self, seconds: i64) {
        self.lock().token_lifetime = seconds;
    }

    /// Answer every request with 503 while set.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Answer every data API request on `table` with 503 while set. Auth
    /// and other tables keep working.
    pub fn set_table_offline(&self, table: &str, offline: bool) {
        let mut store = self.lock();
        if offline {
            store.offline_tables.insert(table.to_string());
        } else {
            store.offline_tables.remove(table);
        }
    }

    /// Number of successful refresh-token grants so far.
    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.lock().refreshes
    }

    /// Number of live access tokens held by a user.
    #[must_use]
    pub fn active_tokens(&self, id: UserId) -> usize {
        self.lock()
            .access_tokens
            .values()
            .filter(|owner| **owner == id)
            .count()
    }
}

// =============================================================================
// Error bodies
// =============================================================================

fn auth_error(status: StatusCode, code: &str, msg: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "error_code": code, "msg": msg })),
    )
        .into_response()
}

fn rest_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": code, "message": message, "details": null, "hint": null })),
    )
        .into_response()
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "message": "upstream unavailable" })),
    )
        .into_response()
}

// =============================================================================
// Auth API
// =============================================================================

#[derive(Deserialize)]
struct GrantQuery {
    grant_type: String,
}

#[derive(Default, Deserialize)]
struct AuthBody {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

async fn health(State(fake): State<FakeBackend>) -> Response {
    if fake.lock().offline {
        return unavailable();
    }
    Json(json!({ "version": "fake", "name": "GoTrue" })).into_response()
}

async fn token(
    State(fake): State<FakeBackend>,
    Query(query): Query<GrantQuery>,
    Json(body): Json<AuthBody>,
) -> Response {
    let mut store = fake.lock();
    if store.offline {
        return unavailable();
    }

    match query.grant_type.as_str() {
        "password" => {
            let email = body.email.as_deref().and_then(|e| Email::parse(e).ok());
            let password = body.password.unwrap_or_default();
            let user = email
                .and_then(|e| store.users.get(&e))
                .filter(|u| u.password == password)
                .map(|u| (u.id, u.confirmed));

            match user {
                Some((id, true)) => Json(store.issue_session(id)).into_response(),
                Some((_, false)) => auth_error(
                    StatusCode::BAD_REQUEST,
                    "email_not_confirmed",
                    "Email not confirmed",
                ),
                None => auth_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_credentials",
                    "Invalid login credentials",
                ),
            }
        }
        "refresh_token" => {
            let presented = body.refresh_token.unwrap_or_default();
            match store.refresh_tokens.remove(&presented) {
                Some(id) => {
                    store.refreshes += 1;
                    Json(store.issue_session(id)).into_response()
                }
                None => auth_error(
                    StatusCode::BAD_REQUEST,
                    "refresh_token_not_found",
                    "Invalid Refresh Token: Refresh Token Not Found",
                ),
            }
        }
        other => auth_error(
            StatusCode::BAD_REQUEST,
            "validation_failed",
            &format!("unsupported grant_type {other}"),
        ),
    }
}

async fn signup(State(fake): State<FakeBackend>, Json(body): Json<AuthBody>) -> Response {
    let mut store = fake.lock();
    if store.offline {
        return unavailable();
    }

    let Some(email) = body.email.as_deref().and_then(|e| Email::parse(e).ok()) else {
        return auth_error(
            StatusCode::BAD_REQUEST,
            "email_address_invalid",
            "Unable to validate email address: invalid format",
        );
    };
    let password = body.password.unwrap_or_default();
    if password.len() < 6 {
        return auth_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "weak_password",
            "Password should be at least 6 characters.",
        );
    }
    if store.users.contains_key(&email) {
        return auth_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "user_already_exists",
            "User already registered",
        );
    }

    let confirmed = !store.confirm_email;
    let id = store.create_user(email.clone(), &password, confirmed);
    if confirmed {
        Json(store.issue_session(id)).into_response()
    } else {
        Json(json!({ "id": id, "email": email, "aud": "authenticated" })).into_response()
    }
}

async fn logout(State(fake): State<FakeBackend>, headers: HeaderMap) -> Response {
    let mut store = fake.lock();
    if store.offline {
        return unavailable();
    }

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    let Some(id) = store.access_tokens.get(token).copied() else {
        return auth_error(StatusCode::UNAUTHORIZED, "bad_jwt", "invalid JWT");
    };

    // Global scope: every session of the user ends
    store.access_tokens.retain(|_, owner| *owner != id);
    store.refresh_tokens.retain(|_, owner| *owner != id);
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// Data API
// =============================================================================

/// Value of a `column=eq.value` filter.
fn eq_filter<'a>(params: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    params.get(column).and_then(|v| v.strip_prefix("eq."))
}

fn limit(params: &HashMap<String, String>) -> usize {
    params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(usize::MAX)
}

fn unknown_table(table: &str) -> Response {
    rest_error(
        StatusCode::NOT_FOUND,
        "42P01",
        &format!("relation \"public.{table}\" does not exist"),
    )
}

async fn select(
    State(fake): State<FakeBackend>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let store = fake.lock();
    if store.table_down(&table) {
        return unavailable();
    }
    let caller = match store.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let id = eq_filter(&params, "id");

    match table.as_str() {
        "apps" => {
            let mut rows: Vec<&App> = store
                .apps
                .iter()
                .filter(|a| id.is_none_or(|id| a.id.to_string() == id))
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows.truncate(limit(&params));
            Json(rows).into_response()
        }
        "profiles" => {
            let admin = store.is_admin(caller);
            let email = eq_filter(&params, "email");
            let mut rows: Vec<&Profile> = store
                .profiles
                .iter()
                .filter(|p| admin || caller == Caller::User(p.id))
                .filter(|p| id.is_none_or(|id| p.id.to_string() == id))
                .filter(|p| email.is_none_or(|email| p.email.as_str() == email))
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows.truncate(limit(&params));
            Json(rows).into_response()
        }
        other => unknown_table(other),
    }
}

async fn insert(
    State(fake): State<FakeBackend>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(draft): Json<AppDraft>,
) -> Response {
    let mut store = fake.lock();
    if store.table_down(&table) {
        return unavailable();
    }
    let caller = match store.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if table != "apps" {
        return unknown_table(&table);
    }
    if !store.is_admin(caller) {
        return rest_error(
            StatusCode::FORBIDDEN,
            "42501",
            "new row violates row-level security policy for table \"apps\"",
        );
    }

    let app = App {
        id: AppId::random(),
        name: draft.name,
        description: draft.description,
        image: draft.image,
        link: draft.link,
        created_at: store.tick(),
    };
    store.apps.push(app.clone());
    (StatusCode::CREATED, Json(vec![app])).into_response()
}

async fn update(
    State(fake): State<FakeBackend>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    let mut store = fake.lock();
    if store.table_down(&table) {
        return unavailable();
    }
    let caller = match store.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    // Rows hidden by the update policy are simply not matched
    let admin = store.is_admin(caller);
    let id = eq_filter(&params, "id").unwrap_or_default().to_string();
    let text = |key: &str| patch.get(key).and_then(Value::as_str).map(str::to_string);
    let flag = |key: &str| patch.get(key).and_then(Value::as_bool);

    match table.as_str() {
        "apps" => {
            let rows: Vec<App> = store
                .apps
                .iter_mut()
                .filter(|a| admin && a.id.to_string() == id)
                .map(|app| {
                    if let Some(v) = text("name") {
                        app.name = v;
                    }
                    if let Some(v) = text("description") {
                        app.description = v;
                    }
                    if let Some(v) = text("image") {
                        app.image = v;
                    }
                    if let Some(v) = text("link") {
                        app.link = v;
                    }
                    app.clone()
                })
                .collect();
            Json(rows).into_response()
        }
        "profiles" => {
            let rows: Vec<Profile> = store
                .profiles
                .iter_mut()
                .filter(|p| admin && p.id.to_string() == id)
                .map(|profile| {
                    if let Some(v) = flag("is_approved") {
                        profile.is_approved = v;
                    }
                    if let Some(v) = flag("is_admin") {
                        profile.is_admin = v;
                    }
                    profile.clone()
                })
                .collect();
            Json(rows).into_response()
        }
        other => unknown_table(other),
    }
}

async fn remove(
    State(fake): State<FakeBackend>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut store = fake.lock();
    if store.table_down(&table) {
        return unavailable();
    }
    let caller = match store.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if table != "apps" {
        return unknown_table(&table);
    }

    let admin = store.is_admin(caller);
    let id = eq_filter(&params, "id").unwrap_or_default().to_string();
    let (deleted, kept): (Vec<App>, Vec<App>) = std::mem::take(&mut store.apps)
        .into_iter()
        .partition(|a| admin && a.id.to_string() == id);
    store.apps = kept;
    Json(deleted).into_response()
}
