//! assetpush - push static build artifacts to object storage

use assetpush::cli::{Cli, Commands, ConfigArgs, PurgeArgs, UploadArgs};
use assetpush::config::{Config, ConfigOverrides};
use assetpush::progress::{print_purge_summary, print_summary};
use assetpush::purge::purge;
use assetpush::storage::{ObjectStore, StorageBackend};
use assetpush::upload::keys::with_prefix;
use assetpush::upload::UploadEngine;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json);

    // Handle Ctrl+C gracefully
    let shutdown = setup_shutdown_handler();

    match cli.command {
        Commands::Upload(args) => handle_upload_command(args).await?,
        Commands::Purge(args) => handle_purge_command(args).await?,
        Commands::Config(args) => handle_config_command(args)?,
    }

    drop(shutdown);
    Ok(())
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("assetpush=info"),
        1 => EnvFilter::new("assetpush=debug"),
        2 => EnvFilter::new("assetpush=trace"),
        _ => EnvFilter::new("trace"),
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn setup_shutdown_handler() -> tokio::sync::oneshot::Sender<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Received Ctrl+C, shutting down...");
                std::process::exit(130);
            }
            _ = rx => {
                // Normal shutdown
            }
        }
    });

    tx
}

async fn handle_upload_command(args: UploadArgs) -> anyhow::Result<()> {
    let (config, location) = args.common.load(args.to_overrides())?;
    let store = StorageBackend::open(&location, &config).await?;
    tracing::info!(
        destination = %location,
        backend = store.name(),
        overwrite = config.overwrite,
        "Starting upload"
    );

    let store: Arc<dyn ObjectStore> = Arc::new(store);
    let summary = UploadEngine::new(&config, store).run().await?;
    print_summary(&summary);

    if summary.stats.failed > 0 {
        anyhow::bail!(
            "{} of {} uploads failed",
            summary.stats.failed,
            summary.stats.total
        );
    }
    Ok(())
}

async fn handle_purge_command(args: PurgeArgs) -> anyhow::Result<()> {
    let (config, location) = args.common.load(ConfigOverrides::default())?;
    let prefix = with_prefix(&config.remote_prefix, &args.prefix);
    if prefix.is_empty() && !args.all {
        anyhow::bail!("refusing to purge the whole bucket without --all");
    }

    let store = StorageBackend::open(&location, &config).await?;
    tracing::info!(
        destination = %location,
        prefix = %prefix,
        dry_run = args.dry_run,
        "Starting purge"
    );

    let summary = purge(&store, &prefix, config.list_page_size, args.dry_run).await;
    print_purge_summary(&summary, args.dry_run);

    if summary.failed > 0 {
        anyhow::bail!("{} objects could not be deleted", summary.failed);
    }
    Ok(())
}

fn handle_config_command(args: ConfigArgs) -> anyhow::Result<()> {
    if args.path {
        match Config::default_config_path() {
            Ok(path) => println!("{}", path.display()),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else {
        let (config, _) = args.common.load(ConfigOverrides::default())?;
        println!("{}", toml::to_string_pretty(&config.redacted())?);
    }
    Ok(())
}
