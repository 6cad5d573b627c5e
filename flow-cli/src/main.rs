//! # flow
//!
//! Terminal front end for the flowsync group timer.
//!
//! ## Commands
//!
//! - `solo`: Run a local timer
//! - `host`: Create a group session and run its timer
//! - `join`: Follow someone else's session
//! - `status`: Print a stored session record
//! - `init-config`: Write a starter configuration file
//!
//! ## Example
//!
//! ```bash
//! # Start hosting; prints a six-character room code
//! flow host --name Ana
//!
//! # In another terminal, follow it
//! flow join --name Ben --code K7Q2ZD
//!
//! # Inspect the shared record
//! flow status --code K7Q2ZD
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;
mod terminal;

use commands::{init_config, run, status};
use config::Config;

/// Shared focus timer for the terminal.
#[derive(Parser, Debug)]
#[command(name = "flow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Shared session directory (overrides the config file)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `flow_client=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a local timer
    Solo,

    /// Create a group session and run its timer
    Host {
        /// Your display name
        #[arg(long, short)]
        name: String,
    },

    /// Join a group session and follow its timer
    Join {
        /// Your display name
        #[arg(long, short)]
        name: String,

        /// Room code from the host
        #[arg(long, short)]
        code: String,
    },

    /// Print a stored session record as JSON
    Status {
        /// Room code to look up
        #[arg(long, short)]
        code: String,
    },

    /// Write a starter configuration file
    InitConfig {
        /// Where to write (default: platform config dir)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    if let Commands::InitConfig { path, force } = &cli.command {
        let path = match path {
            Some(path) => path.clone(),
            None => config::default_config_path().context("Could not determine home directory")?,
        };
        return init_config::run(&path, *force);
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let store_dir = match cli.store_dir.or_else(|| config.sync.store_dir.clone()) {
        Some(dir) => dir,
        None => config::default_store_dir().context("Could not determine home directory")?,
    };

    match cli.command {
        Commands::Solo => run::run(&config, &store_dir, run::Mode::Solo).await?,
        Commands::Host { name } => run::run(&config, &store_dir, run::Mode::Host { name }).await?,
        Commands::Join { name, code } => {
            run::run(&config, &store_dir, run::Mode::Join { name, code }).await?
        }
        Commands::Status { code } => status::run(&store_dir, &code).await?,
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

/// Install the fmt subscriber. `--log-level` wins over `RUST_LOG`; the
/// default is `info`. Logs go to stderr so stdout stays for timer output.
fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("Invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}
