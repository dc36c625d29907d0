//! WealthDesk CLI - the main entry point.
//!
//! Commands:
//! - `serve`  - Start the gateway (HTTP + WebSocket)
//! - `seed`   - Seed the demo dataset into the record store
//! - `doctor` - Diagnose configuration and store health

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "wealthdesk",
    about = "WealthDesk — advisory orchestration engine",
    version,
    author
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
    /// Start the gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Seed the demo dataset if the store is empty
        #[arg(long)]
        seed: bool,
    },

    /// Seed the demo dataset
    Seed,

    /// Diagnose configuration and store health
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port, seed } => commands::serve::run(port, seed).await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
