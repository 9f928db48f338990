//! Data API (PostgREST) calls for the `apps` and `profiles` tables.
//!
//! Every call takes an optional bearer token. Pass the signed-in user's
//! access token so row level security applies to that user; `None` falls
//! back to the client's API key.

use reqwest::Method;
use serde::Serialize;
use tracing::instrument;
use url::Url;
use webapps_gallery_core::{App, AppDraft, AppId, Email, Profile, UserId};

use super::{QueryError, SupabaseClient};

const APPS: &str = "apps";
const PROFILES: &str = "profiles";

#[derive(Serialize)]
struct ApprovalPatch {
    is_approved: bool,
}

#[derive(Serialize)]
struct AdminPatch {
    is_admin: bool,
}

impl SupabaseClient {
    /// List apps, newest first, optionally capped at `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self, bearer))]
    pub async fn list_apps(
        &self,
        bearer: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<App>, QueryError> {
        let mut url = self.select_url(APPS)?;
        if let Some(limit) = limit {
            url.query_pairs_mut().append_pair("limit", &limit.to_string());
        }
        self.execute(self.request(Method::GET, url, bearer)).await
    }

    /// Fetch one app by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self, bearer))]
    pub async fn get_app(
        &self,
        bearer: Option<&str>,
        id: AppId,
    ) -> Result<Option<App>, QueryError> {
        let mut url = self.select_url(APPS)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        let rows: Vec<App> = self.execute(self.request(Method::GET, url, bearer)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert an app and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Api` when row level security refuses the insert.
    #[instrument(skip(self, bearer, draft), fields(name = %draft.name))]
    pub async fn insert_app(
        &self,
        bearer: Option<&str>,
        draft: &AppDraft,
    ) -> Result<App, QueryError> {
        let url = self.table_url(APPS)?;
        let request = self
            .request(Method::POST, url, bearer)
            .header("Prefer", "return=representation")
            .json(draft);

        let rows: Vec<App> = self.execute(request).await?;
        first_row(rows, "App")
    }

    /// Overwrite the writable fields of an app.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NotFound` if no row with that id is visible.
    #[instrument(skip(self, bearer, draft))]
    pub async fn update_app(
        &self,
        bearer: Option<&str>,
        id: AppId,
        draft: &AppDraft,
    ) -> Result<App, QueryError> {
        let url = self.row_url(APPS, &id.to_string())?;
        let request = self
            .request(Method::PATCH, url, bearer)
            .header("Prefer", "return=representation")
            .json(draft);

        let rows: Vec<App> = self.execute(request).await?;
        first_row(rows, "App")
    }

    /// Delete one app by id.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NotFound` if nothing was deleted.
    #[instrument(skip(self, bearer))]
    pub async fn delete_app(&self, bearer: Option<&str>, id: AppId) -> Result<App, QueryError> {
        let url = self.row_url(APPS, &id.to_string())?;
        let request = self
            .request(Method::DELETE, url, bearer)
            .header("Prefer", "return=representation");

        let rows: Vec<App> = self.execute(request).await?;
        first_row(rows, "App")
    }

    /// List every profile visible to the bearer, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self, bearer))]
    pub async fn list_profiles(&self, bearer: Option<&str>) -> Result<Vec<Profile>, QueryError> {
        let url = self.select_url(PROFILES)?;
        self.execute(self.request(Method::GET, url, bearer)).await
    }

    /// Fetch the profile of one user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self, bearer))]
    pub async fn get_profile(
        &self,
        bearer: Option<&str>,
        id: UserId,
    ) -> Result<Option<Profile>, QueryError> {
        let mut url = self.select_url(PROFILES)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        let rows: Vec<Profile> = self.execute(self.request(Method::GET, url, bearer)).await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch a profile by email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self, bearer), fields(email = %email))]
    pub async fn find_profile_by_email(
        &self,
        bearer: Option<&str>,
        email: &Email,
    ) -> Result<Option<Profile>, QueryError> {
        let mut url = self.select_url(PROFILES)?;
        url.query_pairs_mut().append_pair("email", &format!("eq.{email}"));

        let rows: Vec<Profile> = self.execute(self.request(Method::GET, url, bearer)).await?;
        Ok(rows.into_iter().next())
    }

    /// Approve (`true`) or reject (`false`) a user.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NotFound` if no visible profile has that id.
    #[instrument(skip(self, bearer))]
    pub async fn set_profile_approval(
        &self,
        bearer: Option<&str>,
        id: UserId,
        approved: bool,
    ) -> Result<Profile, QueryError> {
        self.patch_profile(bearer, id, &ApprovalPatch {
            is_approved: approved,
        })
        .await
    }

    /// Grant or revoke the admin flag.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NotFound` if no visible profile has that id.
    #[instrument(skip(self, bearer))]
    pub async fn set_profile_admin(
        &self,
        bearer: Option<&str>,
        id: UserId,
        is_admin: bool,
    ) -> Result<Profile, QueryError> {
        self.patch_profile(bearer, id, &AdminPatch { is_admin }).await
    }

    async fn patch_profile<B: Serialize + Sync>(
        &self,
        bearer: Option<&str>,
        id: UserId,
        patch: &B,
    ) -> Result<Profile, QueryError> {
        let url = self.row_url(PROFILES, &id.to_string())?;
        let request = self
            .request(Method::PATCH, url, bearer)
            .header("Prefer", "return=representation")
            .json(patch);

        let rows: Vec<Profile> = self.execute(request).await?;
        first_row(rows, "Profile")
    }

    /// `GET /rest/v1/{table}?select=*&order=created_at.desc`
    fn select_url(&self, table: &str) -> Result<Url, QueryError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "created_at.desc");
        Ok(url)
    }

    /// `{table}?id=eq.{id}`, addressing exactly one row.
    fn row_url(&self, table: &str, id: &str) -> Result<Url, QueryError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        Ok(url)
    }
}

/// Mutations return the touched rows; none means the filter matched nothing.
fn first_row<T>(rows: Vec<T>, what: &str) -> Result<T, QueryError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| QueryError::NotFound(what.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::config::SupabaseConfig;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: Url::parse("https://abcd.supabase.co").unwrap(),
            api_key: SecretString::from("k3y-Abc.123"),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_select_url_orders_newest_first() {
        let url = client().select_url(APPS).unwrap();
        assert_eq!(
            url.as_str(),
            "https://abcd.supabase.co/rest/v1/apps?select=*&order=created_at.desc"
        );
    }

    #[test]
    fn test_row_url_filters_by_id() {
        let id = AppId::random();
        let url = client().row_url(APPS, &id.to_string()).unwrap();
        assert_eq!(url.query(), Some(format!("id=eq.{id}").as_str()));
    }

    #[test]
    fn test_first_row_empty_is_not_found() {
        let err = first_row::<App>(Vec::new(), "App").unwrap_err();
        assert!(matches!(err, QueryError::NotFound(ref what) if what == "App"));
    }
}
