//! Mamás Perrunas session companion - command-line entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use mp_session_lib::{commands, config::Config, logging, AppState};

#[derive(Parser)]
#[command(name = "mp-session")]
#[command(about = "Mamás Perrunas account and session companion")]
#[command(version)]
struct Cli {
    /// API base URL
    #[arg(long, env = "MP_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current session
    Status,

    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MP_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a new account
    Register {
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MP_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and forget the stored token
    Logout,

    /// Show the profile of the logged-in user
    Profile,

    /// Upload a new profile picture
    UploadPhoto { file: PathBuf },

    /// Change the display name
    Rename { nombre: String },

    /// Change the password
    ChangePassword {
        #[arg(long)]
        actual: String,
        #[arg(long)]
        nueva: String,
    },

    /// Cancel registration to an event
    CancelEvent { evento_id: i64 },

    /// Navigate to a route and print where you end up
    Open { path: String },
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url;
    }

    if let Err(e) = logging::init(&config.log_dir()) {
        eprintln!("Logging unavailable: {}", e);
    }
    info!("Mamás Perrunas session companion starting...");

    let state = AppState::new(config).context("failed to initialise application")?;
    let _session_logger = commands::spawn_session_logger(&state);

    match cli.command {
        Commands::Status => print(&commands::get_session(&state))?,
        Commands::Login { email, password } => {
            print(&commands::login(&state, &email, &password).await)?
        }
        Commands::Register { nombre, email, password } => {
            print(&commands::register(&state, &nombre, &email, &password).await)?
        }
        Commands::Logout => print(&commands::logout(&state))?,
        Commands::Profile => {
            let profile = commands::get_profile(&state).await.map_err(anyhow::Error::msg)?;
            print(&profile)?
        }
        Commands::UploadPhoto { file } => {
            let session = commands::upload_photo(&state, &file).await.map_err(anyhow::Error::msg)?;
            print(&session)?
        }
        Commands::Rename { nombre } => print(&commands::rename(&state, &nombre).await)?,
        Commands::ChangePassword { actual, nueva } => {
            print(&commands::change_password(&state, &actual, &nueva).await)?
        }
        Commands::CancelEvent { evento_id } => {
            print(&commands::cancel_event(&state, evento_id).await)?
        }
        Commands::Open { path } => print(&commands::open_route(&state, &path))?,
    }

    Ok(())
}
