//! ihpp - HTTP inspector client
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use ihpp::cli::{Cli, Commands};
use ihpp::config::{Config, ConfigManager};
use ihpp::error::IhppResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> IhppResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    ihpp::ui::init_theme();
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Send(args) => ihpp::cli::commands::send(args, &config).await,
        Commands::Show(args) => ihpp::cli::commands::show(args, &config).await,
        Commands::Hash(args) => ihpp::cli::commands::hash(args).await,
        Commands::Cache(args) => ihpp::cli::commands::cache(args, &config).await,
        Commands::Watch(args) => ihpp::cli::commands::watch(args, &config).await,
        Commands::Config(args) => {
            ihpp::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.verbose` counts as one `-v`
fn init_logging(verbose: u8, config: &Config) {
    let level = verbose.max(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("ihpp=warn"),
        1 => EnvFilter::new("ihpp=info"),
        _ => EnvFilter::new("ihpp=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
