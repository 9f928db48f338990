//! App catalog commands.
//!
//! # Usage
//!
//! ```bash
//! gallery-cli apps list
//! gallery-cli apps seed -f crates/cli/seeds/apps.example.yaml [--dry-run]
//! ```
//!
//! # Seed File Format
//!
//! ```yaml
//! apps:
//!   - name: Sketchpad
//!     description: Draw in the browser
//!     image: https://img.example.com/sketchpad.png
//!     link: https://sketchpad.example.com
//! ```
//!
//! Every entry goes through the same validation as the admin form. Entries
//! whose link is already in the catalog are skipped, so seeding twice is safe.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};
use webapps_gallery_core::{AppDraft, AppForm, Submission};

use super::{CliError, service_client};

/// Top level of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub apps: Vec<SeedApp>,
}

/// One app entry in a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedApp {
    pub name: String,
    pub description: String,
    pub image: String,
    pub link: String,
}

/// Print every app as a table.
///
/// # Errors
///
/// Returns an error if the backend call fails.
pub async fn list() -> Result<(), CliError> {
    let client = service_client()?;
    let apps = client.list_apps(None, None).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:<36}  {:<28}  {:<10}  LINK", "ID", "NAME", "ADDED");
        for app in &apps {
            println!(
                "{:<36}  {:<28}  {:<10}  {}",
                app.id.to_string(),
                app.name,
                app.created_at.format("%Y-%m-%d").to_string(),
                app.link
            );
        }
        println!("{} apps", apps.len());
    }

    Ok(())
}

/// Validate a seed file and insert its apps.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or a backend call fails.
pub async fn seed(path: &Path, dry_run: bool) -> Result<(), CliError> {
    info!(path = %path.display(), "Loading apps from file");

    // Read and validate before touching the backend
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
    let file: SeedFile = serde_yaml::from_str(&content)?;
    info!(apps = file.apps.len(), "Parsed seed file");

    let drafts = validate(&file).map_err(|errors| {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        CliError::InvalidSeed(errors.len())
    })?;

    if dry_run {
        info!(apps = drafts.len(), "Seed file is valid, nothing written (dry run)");
        return Ok(());
    }

    let client = service_client()?;
    let existing: HashSet<String> = client
        .list_apps(None, None)
        .await?
        .into_iter()
        .map(|app| app.link)
        .collect();

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    for draft in new_drafts(drafts, &existing) {
        let Some(draft) = draft else {
            skipped += 1;
            continue;
        };
        let app = client.insert_app(None, &draft).await?;
        info!(app_id = %app.id, name = %app.name, "Inserted app");
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Apps inserted: {inserted}");
    info!("  Apps skipped (link already listed): {skipped}");
    Ok(())
}

/// Run every entry through the admin form validation.
///
/// Returns all problems at once rather than stopping at the first.
fn validate(file: &SeedFile) -> Result<Vec<AppDraft>, Vec<String>> {
    let mut drafts = Vec::with_capacity(file.apps.len());
    let mut errors = Vec::new();

    for (index, entry) in file.apps.iter().enumerate() {
        let mut form = AppForm::new();
        form.set_name(entry.name.as_str());
        form.set_description(entry.description.as_str());
        form.set_image(entry.image.as_str());
        form.set_link(entry.link.as_str());

        match form.submission() {
            Ok(Submission::Create(draft) | Submission::Update(_, draft)) => drafts.push(draft),
            Err(e) => errors.push(format!("apps[{index}] ({}): {e}", entry.name.trim())),
        }
    }

    if errors.is_empty() {
        Ok(drafts)
    } else {
        Err(errors)
    }
}

/// `None` marks a draft whose link is already listed (or repeated earlier
/// in the same file).
fn new_drafts(drafts: Vec<AppDraft>, existing: &HashSet<String>) -> Vec<Option<AppDraft>> {
    let mut seen = existing.clone();
    drafts
        .into_iter()
        .map(|draft| seen.insert(draft.link.clone()).then_some(draft))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SEED: &str = r"
apps:
  - name: Sketchpad
    description: Draw in the browser
    image: https://img.example.com/sketchpad.png
    link: https://sketchpad.example.com
  - name: '  Ledger '
    description: Split bills with friends
    image: https://img.example.com/ledger.png
    link: https://ledger.example.com
";

    #[test]
    fn test_valid_seed_file() {
        let file: SeedFile = serde_yaml::from_str(SEED).unwrap();
        let drafts = validate(&file).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[1].name, "Ledger");
    }

    #[test]
    fn test_invalid_entries_are_all_reported() {
        let yaml = r"
apps:
  - name: ''
    description: Nameless
    image: https://img.example.com/a.png
    link: https://a.example.com
  - name: Ok
    description: Fine
    image: https://img.example.com/b.png
    link: https://b.example.com
  - name: Bad link
    description: Not a web URL
    image: https://img.example.com/c.png
    link: ftp://c.example.com
";
        let file: SeedFile = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&file).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("apps[0]"));
        assert!(errors[0].contains("Name is required"));
        assert!(errors[1].starts_with("apps[2] (Bad link)"));
        assert!(errors[1].contains("Link URL"));
    }

    #[test]
    fn test_existing_and_repeated_links_are_skipped() {
        let file: SeedFile = serde_yaml::from_str(SEED).unwrap();
        let mut drafts = validate(&file).unwrap();
        drafts.push(drafts[1].clone());

        let existing = HashSet::from(["https://sketchpad.example.com".to_string()]);
        let plan = new_drafts(drafts, &existing);

        assert!(plan[0].is_none());
        assert_eq!(plan[1].as_ref().map(|d| d.name.as_str()), Some("Ledger"));
        assert!(plan[2].is_none());
    }

    #[test]
    fn test_missing_field_is_a_parse_error() {
        let yaml = "apps:\n  - name: Only a name\n";
        assert!(serde_yaml::from_str::<SeedFile>(yaml).is_err());
    }
}
