//! Admin app management: create, edit and delete.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;
use webapps_gallery_core::{App, AppForm, AppId, Submission};

use super::{AdminTab, FormRequest, render_panel};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Notice;
use crate::state::AppState;

/// Posted app form. `editing_id` is empty when creating.
#[derive(Debug, Default, Deserialize)]
pub struct AppFormInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub editing_id: String,
}

impl AppFormInput {
    fn into_form(self) -> Result<AppForm> {
        let editing = match self.editing_id.trim() {
            "" => None,
            raw => Some(
                raw.parse::<AppId>()
                    .map_err(|_| AppError::BadRequest(format!("invalid app id: {raw}")))?,
            ),
        };

        let mut form = AppForm::new();
        form.set_name(self.name);
        form.set_description(self.description);
        form.set_image(self.image);
        form.set_link(self.link);
        form.set_editing(editing);
        Ok(form)
    }
}

/// Delete confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub app: App,
}

/// Create or update an app.
///
/// Invalid input and failed writes re-render the panel with the form still
/// filled in; a successful save redirects back to the apps tab.
#[instrument(skip(ctx, state, input), fields(editing = !input.editing_id.is_empty()))]
pub async fn save(
    RequireAdmin(ctx): RequireAdmin,
    State(state): State<AppState>,
    Form(input): Form<AppFormInput>,
) -> Response {
    let form = match input.into_form() {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    let submission = match form.submission() {
        Ok(submission) => submission,
        Err(e) => {
            let request = FormRequest::Rejected {
                form,
                error: e.to_string(),
            };
            return render_panel(&state, &ctx, AdminTab::Apps, request, None).await;
        }
    };

    let client = state.supabase();
    let bearer = ctx.access_token();
    let saved = match &submission {
        Submission::Create(draft) => client
            .insert_app(bearer, draft)
            .await
            .map(|app| (app, Notice::AppCreated)),
        Submission::Update(id, draft) => client
            .update_app(bearer, *id, draft)
            .await
            .map(|app| (app, Notice::AppUpdated)),
    };

    match saved {
        Ok((app, notice)) => {
            tracing::info!(app_id = %app.id, name = %app.name, "App saved");
            add_breadcrumb("admin", notice.message(), &[("app_id", &app.id.to_string())]);
            Redirect::to(&notice.on(&AdminTab::Apps.path())).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Saving app failed");
            let request = FormRequest::Rejected {
                form,
                error: e.user_message(),
            };
            render_panel(&state, &ctx, AdminTab::Apps, request, None).await
        }
    }
}

/// Ask for confirmation before deleting an app.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the app is gone.
#[instrument(skip(ctx, state))]
pub async fn confirm_delete(
    RequireAdmin(ctx): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<AppId>,
) -> Result<ConfirmDeleteTemplate> {
    let app = state
        .supabase()
        .get_app(ctx.access_token(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("App".to_string()))?;

    Ok(ConfirmDeleteTemplate { app })
}

/// Delete an app.
#[instrument(skip(ctx, state))]
pub async fn delete(
    RequireAdmin(ctx): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<AppId>,
) -> Redirect {
    let notice = match state.supabase().delete_app(ctx.access_token(), id).await {
        Ok(app) => {
            tracing::info!(app_id = %app.id, name = %app.name, "App deleted");
            add_breadcrumb("admin", "App deleted", &[("app_id", &app.id.to_string())]);
            Notice::AppDeleted
        }
        Err(e) => {
            tracing::warn!(error = %e, "Deleting app failed");
            Notice::AppDeleteFailed
        }
    };

    Redirect::to(&notice.on(&AdminTab::Apps.path()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> AppFormInput {
        AppFormInput {
            name: "Sketchpad".to_string(),
            description: "Draw in the browser".to_string(),
            image: "https://img.example.com/sketch.png".to_string(),
            link: "https://sketch.example.com".to_string(),
            editing_id: String::new(),
        }
    }

    #[test]
    fn test_empty_editing_id_creates() {
        let form = input().into_form().unwrap();
        assert!(!form.is_editing());
        assert!(matches!(form.submission(), Ok(Submission::Create(_))));
    }

    #[test]
    fn test_editing_id_updates() {
        let id = AppId::random();
        let form = AppFormInput {
            editing_id: id.to_string(),
            ..input()
        }
        .into_form()
        .unwrap();
        assert_eq!(form.editing(), Some(id));
        assert!(matches!(form.submission(), Ok(Submission::Update(target, _)) if target == id));
    }

    #[test]
    fn test_bad_editing_id_is_rejected() {
        let result = AppFormInput {
            editing_id: "not-a-uuid".to_string(),
            ..input()
        }
        .into_form();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
