//! Listed web applications and the admin form that edits them.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::id::AppId;

/// A web application listed in the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub name: String,
    pub description: String,
    /// Absolute URL of the card image.
    pub image: String,
    /// Absolute URL the card links to.
    pub link: String,
    pub created_at: DateTime<Utc>,
}

/// The writable fields of an [`App`], as sent on insert and update.
///
/// Only [`AppForm::submission`] builds one from user input, so a draft has
/// always passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDraft {
    pub name: String,
    pub description: String,
    pub image: String,
    pub link: String,
}

/// A field of the app form, used to point errors at the right input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppField {
    Name,
    Description,
    Image,
    Link,
}

impl AppField {
    /// Human-readable label, as shown next to the input.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Description => "Description",
            Self::Image => "Image URL",
            Self::Link => "Link URL",
        }
    }
}

impl fmt::Display for AppField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Validation failures for the app form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AppFormError {
    #[error("{0} is required")]
    Missing(AppField),
    #[error("{0} must be an absolute http(s) URL")]
    InvalidUrl(AppField),
}

impl AppFormError {
    /// The field the error refers to.
    #[must_use]
    pub const fn field(&self) -> AppField {
        match self {
            Self::Missing(field) | Self::InvalidUrl(field) => *field,
        }
    }
}

/// What submitting the form should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(AppDraft),
    Update(AppId, AppDraft),
}

/// The shared create/edit form of the admin apps tab.
///
/// One form serves both modes: when an editing target is set, submitting
/// updates that record, otherwise it creates a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppForm {
    name: String,
    description: String,
    image: String,
    link: String,
    editing: Option<AppId>,
}

impl AppForm {
    /// An empty form in create mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A form pre-filled from an existing record, targeting it for update.
    #[must_use]
    pub fn for_edit(app: &App) -> Self {
        Self {
            name: app.name.clone(),
            description: app.description.clone(),
            image: app.image.clone(),
            link: app.link.clone(),
            editing: Some(app.id),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_image(&mut self, image: impl Into<String>) {
        self.image = image.into();
    }

    pub fn set_link(&mut self, link: impl Into<String>) {
        self.link = link.into();
    }

    pub const fn set_editing(&mut self, target: Option<AppId>) {
        self.editing = target;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    #[must_use]
    pub fn link(&self) -> &str {
        &self.link
    }

    /// The record being edited, if any.
    #[must_use]
    pub const fn editing(&self) -> Option<AppId> {
        self.editing
    }

    #[must_use]
    pub const fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Clear every field and the editing target (cancel, or after a save).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Validate the current values and decide between insert and update.
    ///
    /// All fields are trimmed and must be non-empty; image and link must be
    /// absolute `http` or `https` URLs.
    ///
    /// # Errors
    ///
    /// Returns the first [`AppFormError`] in field order.
    pub fn submission(&self) -> Result<Submission, AppFormError> {
        let draft = AppDraft {
            name: required(&self.name, AppField::Name)?,
            description: required(&self.description, AppField::Description)?,
            image: web_url(&self.image, AppField::Image)?,
            link: web_url(&self.link, AppField::Link)?,
        };

        Ok(match self.editing {
            Some(id) => Submission::Update(id, draft),
            None => Submission::Create(draft),
        })
    }
}

fn required(value: &str, field: AppField) -> Result<String, AppFormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppFormError::Missing(field));
    }
    Ok(value.to_owned())
}

fn web_url(value: &str, field: AppField) -> Result<String, AppFormError> {
    let value = required(value, field)?;
    let url = Url::parse(&value).map_err(|_| AppFormError::InvalidUrl(field))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppFormError::InvalidUrl(field));
    }
    Ok(value)
}
