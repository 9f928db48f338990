//! WebApps Gallery CLI - migrations and back-office tasks.
//!
//! # Usage
//!
//! ```bash
//! # Apply the backend schema and create the session table
//! gallery-cli migrate
//!
//! # Review sign-ups
//! gallery-cli users list
//! gallery-cli users approve -e ada@example.com
//! gallery-cli users reject -e spam@example.com
//!
//! # Grant (or revoke) admin rights
//! gallery-cli users promote -e ada@example.com
//! gallery-cli users promote -e ada@example.com --revoke
//!
//! # Catalog
//! gallery-cli apps list
//! gallery-cli apps seed -f crates/cli/seeds/apps.example.yaml --dry-run
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `users` - List, approve, reject and promote users
//! - `apps` - List apps and seed them from a YAML file
//!
//! The `users` and `apps` commands call the backend with the service-role
//! key (`SUPABASE_SERVICE_ROLE_KEY`), which bypasses row level security.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gallery-cli")]
#[command(version, about = "WebApps Gallery CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply schema migrations and create the session table
    Migrate,
    /// Manage users and their approval
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Manage the app catalog
    Apps {
        #[command(subcommand)]
        action: AppsAction,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List every user, newest first
    List,
    /// Approve a user so they can browse the full catalog
    Approve {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Reject (unapprove) a user
    Reject {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Grant admin rights
    Promote {
        /// User email address
        #[arg(short, long)]
        email: String,

        /// Revoke admin rights instead
        #[arg(long)]
        revoke: bool,
    },
}

#[derive(Subcommand)]
enum AppsAction {
    /// List every app, newest first
    List,
    /// Insert apps from a YAML file, skipping links that already exist
    Seed {
        /// Path to the YAML seed file
        #[arg(short, long)]
        file: PathBuf,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gallery_cli=info,webapps_gallery=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Users { action } => match action {
            UsersAction::List => commands::users::list().await?,
            UsersAction::Approve { email } => commands::users::set_approval(&email, true).await?,
            UsersAction::Reject { email } => commands::users::set_approval(&email, false).await?,
            UsersAction::Promote { email, revoke } => {
                commands::users::promote(&email, !revoke).await?;
            }
        },
        Commands::Apps { action } => match action {
            AppsAction::List => commands::apps::list().await?,
            AppsAction::Seed { file, dry_run } => commands::apps::seed(&file, dry_run).await?,
        },
    }
    Ok(())
}
