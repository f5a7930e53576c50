//! pagewatch CLI
//!
//! Local execution entry point. For AWS Lambda, use `pagewatch-lambda`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pagewatch::{
    config::{load_config, load_input, merge_and_validate},
    error::{AppError, Result},
    models::{Config, UrlTask},
    pipeline::{Workflow, run_monitor},
    services::{HttpVisitor, JsonLinesSink, MarkerBlockDetector, mailer_from_config},
    storage::{BaselineStore, BlobStore, LocalStorage},
};
use tokio_util::sync::CancellationToken;

/// pagewatch - Web Page Change Monitor
#[derive(Parser, Debug)]
#[command(
    name = "pagewatch",
    version,
    about = "Watches web pages and mails when their content changes"
)]
struct Cli {
    /// Path to storage directory holding baselines and records
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every configured page once
    Run {
        /// JSON run input overriding the config file
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,

    /// Show stored baselines
    Info {
        /// Only show this URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));

    match cli.command {
        Command::Run { input } => {
            let input = input.as_deref().map(load_input).transpose()?;
            let config = merge_and_validate(load_config(&config_path)?, input)?;
            log::info!("Loaded configuration from {}", config_path.display());

            let store: Arc<dyn BlobStore> = Arc::new(
                LocalStorage::new(&cli.storage_dir)
                    .with_public_base_url(config.storage.public_base_url.clone()),
            );
            let detector = Arc::new(MarkerBlockDetector::new(&config.crawler.block_markers)?);
            let visitor = Arc::new(HttpVisitor::new(&config.crawler, detector)?);
            let mailer = mailer_from_config(&config.notification)?;
            let workflow = Arc::new(Workflow::from_config(&config, visitor, store, mailer));
            let sink = Arc::new(JsonLinesSink::new(
                cli.storage_dir.join(&config.storage.records_file),
            ));

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, finishing pages already saving...");
                    on_signal.cancel();
                }
            });

            let summary = run_monitor(
                workflow,
                config.tasks.clone(),
                config.crawler.max_concurrent,
                sink,
                cancel,
            )
            .await?;

            log::info!(
                "Records appended to {}",
                cli.storage_dir.join(&config.storage.records_file).display()
            );
            if summary.failed > 0 {
                log::warn!("{} page(s) could not be checked", summary.failed);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            let config = Config::load(&config_path)?;

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            MarkerBlockDetector::new(&config.crawler.block_markers)?;
            log::info!("✓ Config OK ({} task(s))", config.tasks.len());
        }

        Command::Info { url } => {
            let config = Config::load_or_default(&config_path);
            let store = Arc::new(
                LocalStorage::new(&cli.storage_dir)
                    .with_public_base_url(config.storage.public_base_url.clone()),
            );
            let baselines = BaselineStore::new(store);

            log::info!("Storage directory: {}", cli.storage_dir.display());
            let tasks: Vec<&UrlTask> = config
                .tasks
                .iter()
                .filter(|t| url.as_deref().is_none_or(|u| t.url == u))
                .collect();
            if tasks.is_empty() {
                log::info!("No matching tasks configured.");
            }

            for task in tasks {
                match baselines.load(task).await? {
                    Some(baseline) => {
                        log::info!("{} [{}]", task.url, task.key());
                        log::info!(
                            "  content: {}",
                            baseline.content.as_deref().unwrap_or("<none>")
                        );
                        match &baseline.screenshot {
                            Some(shot) => log::info!(
                                "  screenshot: {} ({} bytes)",
                                baselines.screenshot_url(task, shot),
                                shot.len()
                            ),
                            None => log::info!("  screenshot: <none>"),
                        }
                    }
                    None => log::info!("{}: no baseline yet", task.url),
                }
            }
        }

        Command::Init { force } => {
            if config_path.exists() && !force {
                log::warn!(
                    "Config already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let config = Config {
                tasks: vec![UrlTask::new("https://example.com/", "h1")],
                ..Config::default()
            };
            std::fs::write(&config_path, config.to_toml()?)
                .map_err(|e| AppError::config(format!("{}: {e}", config_path.display())))?;
            log::info!("Default config written to {}", config_path.display());
        }
    }

    Ok(())
}
