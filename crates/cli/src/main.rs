//! LightLocal CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the web chat page and HTTP API
//! - `chat`: Terminal chat, interactive or single-message
//! - `models`: List configured and installed models
//! - `doctor`: Check config and inference server reachability
//! - `onboard`: Write the default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "lightlocal",
    about = "LightLocal AI — Ultra-Fast Offline Chat over a local Ollama server",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web chat page
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Chat in the terminal
    Chat {
        /// Model to use instead of the configured default
        #[arg(long)]
        model: Option<String>,

        /// System prompt sent with every turn
        #[arg(long)]
        system: Option<String>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List configured and installed models
    Models,

    /// Diagnose configuration and inference server health
    Doctor,

    /// Write the default configuration file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await?,
        Commands::Chat {
            model,
            system,
            message,
        } => commands::chat::run(model, system, message).await?,
        Commands::Models => commands::models::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
