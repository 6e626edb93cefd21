//! PageLens CLI - run and inspect the overlay coordinator.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use clap::{Args, Parser, Subcommand};
use pagelens::error::{PageLensError, Result};
use pagelens::prelude::*;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// PageLens - background coordinator for the page-analysis overlay
#[derive(Parser)]
#[command(name = "pagelens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init(InitArgs),

    /// Run the coordinator (bus + router + session registry)
    Serve,

    /// Show coordinator status and configuration
    Status,

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the init command
#[derive(Args)]
struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pagelens={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init(args) => cmd_init(args).await,
        Commands::Serve => cmd_serve().await,
        Commands::Status => cmd_status().await,
        Commands::Config(args) => cmd_config(args).await,
    }
}

/// Initialize configuration.
async fn cmd_init(args: InitArgs) -> Result<()> {
    let config_file = config_path();

    if config_file.exists() && !args.force {
        println!("Configuration already exists at: {}", config_file.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    init_config().await?;

    println!("Configuration created: {}", config_file.display());
    println!();
    println!("Next steps:");
    println!("  1. edit {} to point at your worker deployment", config_file.display());
    println!("  2. pagelens serve");

    Ok(())
}

/// Run the coordinator until interrupted.
async fn cmd_serve() -> Result<()> {
    let config = load_config().await?;

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            tracing::warn!("config: {issue}");
        }
    }

    let gateway = Gateway::new(&config)?;

    println!("Coordinator running. Press Ctrl+C to stop.\n");

    tokio::select! {
        result = gateway.run() => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
            gateway.stop().await;
            Ok(())
        }
    }
}

/// Show status.
async fn cmd_status() -> Result<()> {
    let config_file = config_path();

    println!("PageLens Status\n");

    println!("Configuration:");
    println!("  Path:   {}", config_file.display());
    println!(
        "  Exists: {}",
        if config_file.exists() { "yes" } else { "no" }
    );

    match load_config().await {
        Ok(config) => {
            let issues = config.validate();
            println!(
                "  Valid:  {}",
                if issues.is_empty() { "yes" } else { "no" }
            );
            for issue in issues {
                println!("    - {issue}");
            }
            println!();
            println!("Workers:");
            let endpoints = WorkerEndpoints::from_config(&config);
            for worker in [
                Worker::Analyzer,
                Worker::Search,
                Worker::Insights,
                Worker::Qa,
                Worker::AnalyzeQuestion,
                Worker::YoutubeTranscript,
                Worker::ClearSession,
            ] {
                println!("  {:<20} {}", worker.wire_name(), endpoints.resolve(worker));
            }
            println!();
            println!(
                "Search API key: {}",
                if config.search_api_key.is_some() { "set" } else { "-" }
            );
            println!("Request timeout: {}s", config.request_timeout_secs);
        }
        Err(e) => {
            println!("  Valid:  no ({e})");
        }
    }

    Ok(())
}

/// Configuration management.
async fn cmd_config(args: ConfigArgs) -> Result<()> {
    let config_file = config_path();

    match args.command {
        ConfigCommands::Path => {
            println!("{}", config_file.display());
        }
        ConfigCommands::Show => {
            if config_file.exists() {
                let content = tokio::fs::read_to_string(&config_file)
                    .await
                    .map_err(|e| PageLensError::config(format!("failed to read config: {e}")))?;
                println!("{content}");
            } else {
                println!("Configuration file does not exist.");
                println!("Run 'pagelens init' to create one.");
            }
        }
        ConfigCommands::Validate => {
            if !config_file.exists() {
                println!("error: configuration file does not exist");
                return Ok(());
            }

            match load_config().await {
                Ok(config) => {
                    let issues = config.validate();
                    if issues.is_empty() {
                        println!("Configuration is valid");
                    } else {
                        for issue in issues {
                            println!("error: {issue}");
                        }
                    }
                }
                Err(e) => println!("error: {e}"),
            }
        }
    }

    Ok(())
}
