//! Zapata - command-line client for the footing calculation service.
//!
//! Logs in against the calculation backend, keeps the session token between
//! runs, and submits footing parameters for calculation.

mod commands;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{parse_storage, Command, Context};
use zapata_core::config::StorageKind;

/// Footing calculator client
#[derive(Parser, Debug)]
#[command(name = "zapata")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// API base URL (defaults to the hosted backend)
    #[arg(long, global = true, env = "ZAPATA_API_URL")]
    api_url: Option<String>,

    /// Token storage: file, keyring or memory
    #[arg(long, global = true, env = "ZAPATA_STORAGE", value_parser = parse_storage)]
    storage: Option<StorageKind>,

    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    info!(command = ?cli.command, "Zapata starting");

    let mut ctx = Context::new(cli.api_url, cli.storage)?;
    let result = ctx.run(cli.command).await;
    ctx.shutdown();

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
