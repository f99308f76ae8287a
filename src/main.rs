//! pyp - portable package launcher
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pyp::cli::{Cli, Commands};
use pyp::config::{Config, ConfigManager};
use pyp::error::LauncherResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Conventional exit status after SIGINT
const INTERRUPTED_EXIT: u8 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancellation() => {
            println!("{}", e);
            ExitCode::SUCCESS
        }
        Err(e) if e.is_interrupted() => {
            eprintln!("{}", style(e).yellow());
            ExitCode::from(INTERRUPTED_EXIT)
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> LauncherResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load()?;

    init_logging(cli.verbose, &config);
    debug!("Config file: {}", config_manager.path().display());

    match cli.into_command() {
        Commands::Run(args) => pyp::cli::commands::run(args, &config).await,
        Commands::Cache(args) => pyp::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            pyp::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn (phase messages only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("pyp=warn"),
        1 => EnvFilter::new("pyp=info"),
        _ => EnvFilter::new("pyp=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
