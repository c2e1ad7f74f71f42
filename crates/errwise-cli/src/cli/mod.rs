//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;

use crate::logging;

mod commands;

#[derive(Parser)]
#[command(name = "errwise")]
#[command(version = "0.1")]
#[command(about = "ErrWise - AI-powered error explanations from your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in to the ErrWise backend
    Login {
        /// Username to authenticate as
        #[arg(short, long)]
        username: String,
    },

    /// Log out and clear the stored session
    Logout,

    /// Show the current session status
    Status,

    /// Submit an error message for an AI explanation
    Explain {
        /// The error text to explain (reads stdin when omitted)
        #[arg(value_name = "ERROR_TEXT")]
        text: Option<String>,
    },

    /// List previously analyzed errors
    History,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Show the effective configuration
    Show,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init().context("initialize logging")?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { username } => commands::auth::login(&username).await,
        Commands::Logout => commands::auth::logout().await,
        Commands::Status => commands::auth::status().await,
        Commands::Explain { text } => commands::explain::run(text.as_deref()).await,
        Commands::History => commands::explain::history().await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Show => commands::config::show(),
        },
    }
}
