//! Pioneer Hub admin CLI
//!
//! Signs in, opens the portal against the realtime database and runs one
//! command.
//!
//! ## Usage
//!
//! ```bash
//! export PIONEER_DATABASE_URL=https://demo-default-rtdb.firebaseio.com
//! export PIONEER_API_KEY=...
//! export PIONEER_EMAIL=admin@example.com
//! export PIONEER_PASSWORD=...
//!
//! pioneer-admin pioneers list --search shop
//! pioneer-admin pioneers add --name Ann --page ann.page --status PARTNER
//! pioneer-admin pioneers edit -NabcXYZ --status FROZEN
//! pioneer-admin pioneers remove -NabcXYZ
//! pioneer-admin capacity set 150
//! pioneer-admin status set --status Maintenance --message "Back at noon"
//! pioneer-admin roadmap add --title Launch --description "Public beta" --icon rocket
//! pioneer-admin watch
//! ```

mod commands;

use clap::{Parser, Subcommand};
use pioneer_store::{PasswordAuth, RestStore};
use pioneer_sync::{Portal, PortalConfig, SdkError, Session};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pioneer-admin")]
#[command(about = "Manage pioneers, capacity, server status and roadmap")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Realtime database URL
    #[arg(long, env = "PIONEER_DATABASE_URL")]
    database_url: Option<String>,

    /// Project web API key
    #[arg(long, env = "PIONEER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Administrator email
    #[arg(long, env = "PIONEER_EMAIL")]
    email: Option<String>,

    /// Administrator password
    #[arg(long, env = "PIONEER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Seconds to wait for each collection's first snapshot
    #[arg(long)]
    sync_timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pioneer directory
    #[command(subcommand)]
    Pioneers(commands::PioneerCommand),

    /// Public capacity
    #[command(subcommand)]
    Capacity(commands::CapacityCommand),

    /// Server status banner
    #[command(subcommand)]
    Status(commands::StatusCommand),

    /// Public roadmap
    #[command(subcommand)]
    Roadmap(commands::RoadmapCommand),

    /// Print pioneer and capacity changes until Ctrl-C
    Watch,

    /// Show which connection settings are present
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let filter = match "pioneer_sync=info".parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = match e.downcast_ref::<SdkError>() {
                Some(sdk) => sdk.user_message(),
                None => format!("{:#}", e),
            };
            error!(error = %e, "Command failed");
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = PortalConfig::load_or_default(args.config.as_deref())?;

    // Apply CLI and environment overrides
    if let Some(url) = args.database_url {
        config.database_url = Some(url);
    }
    if let Some(key) = args.api_key {
        config.api_key = Some(key);
    }
    if let Some(secs) = args.sync_timeout {
        config.sync_timeout_secs = secs;
    }

    for (setting, presence) in config.presence_report() {
        info!(setting, presence = %presence, "Connection setting");
    }

    if let Command::Config = args.command {
        for (setting, presence) in config.presence_report() {
            println!("{:<14} {}", setting, presence);
        }
        return Ok(());
    }

    let email = args
        .email
        .ok_or_else(|| SdkError::Config("email is not set (PIONEER_EMAIL)".into()))?;
    let password = args
        .password
        .ok_or_else(|| SdkError::Config("password is not set (PIONEER_PASSWORD)".into()))?;

    let auth = PasswordAuth::new(config.require_api_key()?).map_err(SdkError::from)?;
    let session = Session::start(Arc::new(auth));
    session.sign_in(&email, &password).await?;

    let store = RestStore::new(config.rest_config(session.id_token())?).map_err(SdkError::from)?;
    let mut portal = Portal::open(&session, Arc::new(store), &config).await?;

    let result = match args.command {
        Command::Pioneers(cmd) => commands::pioneers(&portal, cmd).await,
        Command::Capacity(cmd) => commands::capacity(&portal, cmd).await,
        Command::Status(cmd) => commands::status(&portal, cmd).await,
        Command::Roadmap(cmd) => commands::roadmap(&portal, cmd).await,
        Command::Watch => commands::watch(&portal).await,
        Command::Config => Ok(()),
    };

    portal.close().await;
    session.shutdown();
    result
}
