//! murmur CLI, the main entry point.
//!
//! Commands:
//! - `init`    : Write a default config file
//! - `status`  : Show the resolved configuration
//! - `run`     : Run one cycle and print its summary
//! - `mentions`: List or process new mentions
//! - `tier`    : Show (or refresh) the detected API tier
//! - `serve`   : Start the HTTP gateway and the scheduler

use clap::{Parser, Subcommand};
use murmur_agent::CycleMode;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "murmur", about = "murmur: an autonomous posting agent", version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.murmur/config.toml)
    #[arg(short, long, global = true, env = "MURMUR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Show the resolved configuration (secrets redacted)
    Status,

    /// Run one cycle and print the JSON summary
    Run {
        /// batch or continuous (defaults to the configured schedule mode)
        #[arg(short, long)]
        mode: Option<CycleMode>,

        /// Record publishes in-process instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// List new mentions, or process them with --process
    Mentions {
        #[arg(long)]
        process: bool,
    },

    /// Show the detected API tier
    Tier {
        /// Force a detection call first
        #[arg(long)]
        refresh: bool,
    },

    /// Start the HTTP gateway and the job scheduler
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli.config.unwrap_or_else(commands::default_config_path);

    match cli.command {
        Commands::Init => commands::init::run(&config_path)?,
        Commands::Status => commands::status::run(&config_path)?,
        Commands::Run { mode, dry_run } => commands::run::run(&config_path, mode, dry_run).await?,
        Commands::Mentions { process } => commands::mentions::run(&config_path, process).await?,
        Commands::Tier { refresh } => commands::tier::run(&config_path, refresh).await?,
        Commands::Serve { port } => commands::serve::run(&config_path, port).await?,
    }

    Ok(())
}
