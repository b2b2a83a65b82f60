//! Crestline CLI - migrations, admin accounts and the admin login.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! crestline migrate
//!
//! # Create an admin (password from CRESTLINE_ADMIN_PASSWORD or stdin)
//! crestline admin create -u jane -f Jane -l Doe -r admin -p blog:write
//!
//! # Log in against the admin server and keep the session
//! crestline login -u jane
//! crestline status
//! crestline logout
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run admin database migrations
//! - `admin` - Create, update and deactivate admin accounts, purge sessions
//! - `settings lockout` - Override the server's lockout policy
//! - `login` / `status` / `logout` - Admin session on this machine

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "crestline")]
#[command(author, version, about = "Crestline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run admin database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage runtime settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Log in to the admin server
    Login {
        /// Admin username
        #[arg(short, long)]
        username: String,
    },
    /// Check the stored admin session
    Status,
    /// End the stored admin session
    Logout,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Admin role (`super_admin`, `admin`, `editor`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Permission granted to the admin (repeatable)
        #[arg(short, long = "permission")]
        permissions: Vec<String>,
    },
    /// Replace an admin's password
    SetPassword {
        #[arg(short, long)]
        username: String,
    },
    /// Deactivate an admin and revoke their sessions
    Deactivate {
        #[arg(short, long)]
        username: String,
    },
    /// Bearer session maintenance
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// Delete expired and revoked sessions
    Purge,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Set the failed-login lockout policy
    Lockout {
        /// Failures before a username is locked
        #[arg(long)]
        max_attempts: u32,

        /// Lockout length in minutes
        #[arg(long)]
        minutes: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::admin().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                first_name,
                last_name,
                role,
                permissions,
            } => {
                commands::admin::create_user(&username, &first_name, &last_name, &role, permissions)
                    .await?;
            }
            AdminAction::SetPassword { username } => {
                commands::admin::set_password(&username).await?;
            }
            AdminAction::Deactivate { username } => {
                commands::admin::deactivate(&username).await?;
            }
            AdminAction::Sessions {
                action: SessionsAction::Purge,
            } => {
                commands::admin::purge_sessions().await?;
            }
        },
        Commands::Settings {
            action: SettingsAction::Lockout {
                max_attempts,
                minutes,
            },
        } => commands::admin::set_lockout(max_attempts, minutes).await?,
        Commands::Login { username } => commands::session::login(&username).await?,
        Commands::Status => commands::session::status().await?,
        Commands::Logout => commands::session::logout().await?,
    }
    Ok(())
}
