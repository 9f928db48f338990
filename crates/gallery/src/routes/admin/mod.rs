//! Admin panel route handlers.
//!
//! The panel has two tabs: apps (create, edit, delete) and users (approve,
//! reject). Every handler takes [`RequireAdmin`], so only approved admins
//! get past the extractor; row level security enforces the same rule on the
//! backend for every write.

pub mod apps;
pub mod users;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;
use webapps_gallery_core::{App, AppForm, AppId, Profile};

use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Notice;
use crate::services::SessionContext;
use crate::state::AppState;

/// Admin panel tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdminTab {
    #[default]
    Apps,
    Users,
}

impl AdminTab {
    /// Parse the `?tab=` value. Anything unknown shows the apps tab.
    #[must_use]
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw {
            Some("users") => Self::Users,
            _ => Self::Apps,
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Apps => "apps",
            Self::Users => "users",
        }
    }

    #[must_use]
    pub const fn is_apps(self) -> bool {
        matches!(self, Self::Apps)
    }

    #[must_use]
    pub const fn is_users(self) -> bool {
        matches!(self, Self::Users)
    }

    /// Panel URL with this tab selected.
    #[must_use]
    pub fn path(self) -> String {
        format!("/admin?tab={}", self.code())
    }
}

/// Query parameters for the admin panel.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub tab: Option<String>,
    /// `new` opens an empty app form.
    pub form: Option<String>,
    /// Id of the app to edit.
    pub edit: Option<String>,
    pub notice: Option<String>,
}

/// Which app form the panel shows, if any.
#[derive(Debug)]
pub enum FormRequest {
    Closed,
    New,
    Edit(String),
    /// A submitted form that failed validation or the backend write, shown
    /// again with the entered values.
    Rejected { form: AppForm, error: String },
}

impl FormRequest {
    fn from_query(query: &AdminQuery) -> Self {
        if let Some(raw) = &query.edit {
            Self::Edit(raw.clone())
        } else if query.form.as_deref() == Some("new") {
            Self::New
        } else {
            Self::Closed
        }
    }
}

/// Admin panel template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminTemplate {
    pub admin_email: String,
    pub tab: AdminTab,
    pub apps: Vec<App>,
    pub profiles: Vec<Profile>,
    pub pending_count: usize,
    pub form: Option<AppForm>,
    pub form_error: Option<String>,
    /// Load failures, shown above the tabs.
    pub errors: Vec<String>,
    pub notice: Option<Notice>,
}

/// Display the admin panel.
#[instrument(skip(ctx, state, query))]
pub async fn index(
    RequireAdmin(ctx): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Response {
    let tab = AdminTab::from_query(query.tab.as_deref());
    let notice = query.notice.as_deref().and_then(Notice::from_code);
    render_panel(&state, &ctx, tab, FormRequest::from_query(&query), notice).await
}

/// Load apps and profiles concurrently and render the panel.
///
/// A failed load leaves that list empty and shows an error; the other list
/// still renders.
pub async fn render_panel(
    state: &AppState,
    ctx: &SessionContext,
    tab: AdminTab,
    request: FormRequest,
    notice: Option<Notice>,
) -> Response {
    let client = state.supabase();
    let bearer = ctx.access_token();
    let (apps, profiles) = tokio::join!(
        client.list_apps(bearer, None),
        client.list_profiles(bearer)
    );

    let mut errors = Vec::new();
    let (apps, apps_loaded) = match apps {
        Ok(apps) => (apps, true),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load apps for admin panel");
            errors.push(format!("Could not load apps: {}", e.user_message()));
            (Vec::new(), false)
        }
    };
    let profiles = profiles.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load profiles for admin panel");
        errors.push(format!("Could not load users: {}", e.user_message()));
        Vec::new()
    });

    let status = if matches!(request, FormRequest::Rejected { .. }) {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    // The app form lives on the apps tab
    let tab = if matches!(request, FormRequest::Closed) {
        tab
    } else {
        AdminTab::Apps
    };

    let (form, form_error) = match request {
        FormRequest::Closed => (None, None),
        FormRequest::New => (Some(AppForm::new()), None),
        FormRequest::Edit(raw) => {
            let target = raw
                .parse::<AppId>()
                .ok()
                .and_then(|id| apps.iter().find(|app| app.id == id));
            match target {
                Some(app) => (Some(AppForm::for_edit(app)), None),
                None => {
                    if apps_loaded {
                        errors.push("That app no longer exists.".to_string());
                    }
                    (None, None)
                }
            }
        }
        FormRequest::Rejected { form, error } => (Some(form), Some(error)),
    };

    let pending_count = profiles.iter().filter(|p| p.is_pending()).count();

    (
        status,
        AdminTemplate {
            admin_email: ctx.email().map(ToString::to_string).unwrap_or_default(),
            tab,
            apps,
            profiles,
            pending_count,
            form,
            form_error,
            errors,
            notice,
        },
    )
        .into_response()
}
