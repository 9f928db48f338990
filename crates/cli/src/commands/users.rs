//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! gallery-cli users list
//! gallery-cli users approve -e ada@example.com
//! gallery-cli users reject -e spam@example.com
//! gallery-cli users promote -e ada@example.com [--revoke]
//! ```
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Project URL of the hosted backend
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service-role API key

use webapps_gallery::supabase::SupabaseClient;
use webapps_gallery_core::{Email, Profile};

use super::{CliError, service_client};

/// Print every user as a table.
///
/// # Errors
///
/// Returns an error if the backend call fails.
pub async fn list() -> Result<(), CliError> {
    let client = service_client()?;
    let profiles = client.list_profiles(None).await?;
    let pending = profiles.iter().filter(|p| p.is_pending()).count();

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{:<36}  {:<40}  {:<8}  {:<5}  JOINED",
            "ID", "EMAIL", "STATUS", "ROLE"
        );
        for profile in &profiles {
            println!("{}", format_row(profile));
        }
        println!("{} users, {pending} pending", profiles.len());
    }

    Ok(())
}

/// Approve (`true`) or reject (`false`) the user with this email.
///
/// # Errors
///
/// Returns an error if the email is invalid, no user has it, or the update fails.
pub async fn set_approval(email: &str, approved: bool) -> Result<(), CliError> {
    let client = service_client()?;
    let profile = find(&client, email).await?;

    let updated = client
        .set_profile_approval(None, profile.id, approved)
        .await?;

    tracing::info!(
        user_id = %updated.id,
        email = %updated.email,
        status = updated.status_label(),
        "User approval updated"
    );
    Ok(())
}

/// Grant (`true`) or revoke (`false`) admin rights.
///
/// # Errors
///
/// Returns an error if the email is invalid, no user has it, or the update fails.
pub async fn promote(email: &str, is_admin: bool) -> Result<(), CliError> {
    let client = service_client()?;
    let profile = find(&client, email).await?;

    let updated = client.set_profile_admin(None, profile.id, is_admin).await?;

    tracing::info!(
        user_id = %updated.id,
        email = %updated.email,
        role = updated.role_label(),
        "User role updated"
    );
    if updated.is_admin && !updated.is_approved {
        tracing::warn!(
            "User is not approved yet. Approve them too, or the admin panel stays closed: \
             gallery-cli users approve -e {}",
            updated.email
        );
    }
    Ok(())
}

async fn find(client: &SupabaseClient, email: &str) -> Result<Profile, CliError> {
    let email = Email::parse(email)?;
    client
        .find_profile_by_email(None, &email)
        .await?
        .ok_or_else(|| CliError::UserNotFound(email.to_string()))
}

fn format_row(profile: &Profile) -> String {
    format!(
        "{:<36}  {:<40}  {:<8}  {:<5}  {}",
        profile.id.to_string(),
        profile.email.as_str(),
        profile.status_label(),
        profile.role_label(),
        profile.created_at.format("%Y-%m-%d")
    )
}
