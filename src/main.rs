//! admin-chat - terminal support-chat panel for booking platform operators
//!
//! Talks to the booking backend's REST endpoints for identity, roster and
//! history, and to its Socket.IO relay for live messages.

mod api;
mod config;
mod models;
mod panel;
mod relay;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "admin-chat")]
#[command(about = "Operator chat panel for the booking platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the API token and endpoints
    Login {
        /// Bearer token issued by the booking backend
        #[arg(short, long)]
        token: Option<String>,

        /// REST base URL (e.g. http://localhost:5000/api)
        #[arg(long)]
        api_url: Option<String>,

        /// Relay base URL (e.g. http://localhost:5000)
        #[arg(long)]
        socket_url: Option<String>,
    },

    /// Clear the stored token
    Logout,

    /// Show configuration and token status
    Status,

    /// Show the operator identity (verify the token works)
    Whoami,

    /// List customers with an existing conversation
    Roster,

    /// Print the conversation with one customer
    History {
        /// Counterpart user ID (from `roster` output)
        counterpart_id: String,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Send a message over the relay
    Send {
        /// Counterpart user ID
        #[arg(short, long)]
        to: String,

        /// Message content
        message: String,
    },

    /// Print live relay traffic
    Listen {
        /// Only show messages to or from this counterpart
        #[arg(short, long)]
        with: Option<String>,
    },

    /// Launch the terminal chat panel
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // In TUI mode stderr belongs to the alternate screen, so logs are captured.
    let captured = matches!(cli.command, Commands::Tui).then(tui::LogBuffer::new);

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(captured.clone().map(|log| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(log)
        }))
        .with(
            captured
                .is_none()
                .then(|| tracing_subscriber::fmt::layer().with_target(false)),
        )
        .init();

    match cli.command {
        Commands::Login {
            token,
            api_url,
            socket_url,
        } => {
            config::login(token, api_url, socket_url)?;
        }
        Commands::Logout => {
            config::logout()?;
        }
        Commands::Status => {
            config::status()?;
        }
        Commands::Whoami => {
            api::whoami().await?;
        }
        Commands::Roster => {
            tracing::info!("Fetching roster...");
            api::list_roster().await?;
        }
        Commands::History {
            counterpart_id,
            limit,
        } => {
            api::read_history(&counterpart_id, limit).await?;
        }
        Commands::Send { to, message } => {
            tracing::info!("Sending message...");
            relay::send_message(&to, &message).await?;
        }
        Commands::Listen { with } => {
            relay::listen(with).await?;
        }
        Commands::Tui => {
            let log = captured.unwrap_or_default();
            let result = tui::run(log.clone()).await;
            if result.is_err() {
                // Replay what was captured so the failure has context.
                for line in log.snapshot() {
                    eprintln!("{}", line);
                }
            }
            result?;
        }
    }

    Ok(())
}
