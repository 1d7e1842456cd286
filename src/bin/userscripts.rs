//! Userscripts host
//!
//! Usage:
//!   userscripts [--config <file>] [--local-dir <dir>] [--cache-dir <dir>] run
//!   userscripts resolve
//!   userscripts list

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use userscripts::module::Origin;
use userscripts::utils::{init_logging_from_config, wait_for_shutdown_signal};
use userscripts::{LoaderConfig, LoggingConfig, ModuleManager};

#[derive(Parser, Debug)]
#[command(name = "userscripts", version, about = "Load, resolve and run user script modules")]
struct Args {
    /// Configuration file (JSON, or TOML by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of local scripts
    #[arg(long, global = true)]
    local_dir: Option<PathBuf>,

    /// Directory retrieved scripts are cached in
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Log filter, e.g. "debug" (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enable all scripts, wait for a shutdown signal, then disable them
    Run,
    /// Retrieve missing dependencies and print the enable order
    Resolve,
    /// Retrieve missing dependencies and print every script with its dependencies
    List,
}

fn load_config(args: &Args) -> anyhow::Result<LoaderConfig> {
    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if let Some(dir) = &args.local_dir {
        config.local_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(filter) = &args.log_filter {
        config
            .logging
            .get_or_insert_with(LoggingConfig::default)
            .filter = Some(filter.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging_from_config(config.logging.as_ref());

    let mut manager = ModuleManager::from_config(&config)?;
    info!("Local scripts: {:?}", manager.local_dir());
    info!("Script cache: {:?}", manager.cache_dir());

    match args.command {
        Command::Run => {
            let summary = manager.enable().await?;
            info!("{} scripts enabled", summary.order.len());
            wait_for_shutdown_signal().await;
            manager.disable().await?;
        }
        Command::Resolve => {
            let registry = manager.resolve().await?;
            for name in manager.enable_order(&registry)? {
                println!("{}", name);
            }
        }
        Command::List => {
            let registry = manager.resolve().await?;
            for module in registry.modules() {
                match &module.origin {
                    Origin::Local => println!("{} (local)", module.name),
                    Origin::Remote(uri) => println!("{} ({})", module.name, uri),
                }
                for (dep_name, edge) in module.dependencies() {
                    println!("  {} = {} [{}]", edge.alias, edge.uri, dep_name);
                }
            }
        }
    }

    Ok(())
}
