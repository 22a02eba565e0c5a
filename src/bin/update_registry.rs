//! Rebuild the local stock registry from the corporate-directory cache,
//! backing up the old file and logging what changed.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use krx_stocks::models::Config;
use krx_stocks::registry::{
    backup_registry, diff_registries, load_corp_directory, load_stock_registry,
    registry_from_directory, write_stock_registry,
};

#[derive(Parser)]
#[command(
    name = "update-registry",
    about = "Rebuild the stock registry from the corporate directory cache"
)]
struct Args {
    /// Show what would change without writing anything
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let directory = load_corp_directory(&config.corp_cache_path)?;
    let new_rows = registry_from_directory(&directory);
    info!("directory snapshot yields {} listed companies", new_rows.len());

    let old_rows = if std::path::Path::new(&config.registry_path).exists() {
        load_stock_registry(&config.registry_path)?
    } else {
        Vec::new()
    };
    let (added, removed) = diff_registries(&old_rows, &new_rows);
    info!("{} tickers added, {} removed", added.len(), removed.len());
    for ticker in &added {
        info!("added: {}", ticker);
    }
    for ticker in &removed {
        info!("removed: {}", ticker);
    }

    if args.dry_run {
        info!("dry run, registry not written");
        return Ok(());
    }

    if let Some(backup) = backup_registry(&config.registry_path)? {
        info!("previous registry backed up to {}", backup.display());
    }
    write_stock_registry(&config.registry_path, &new_rows)?;
    info!(
        "registry {} updated with {} rows",
        config.registry_path,
        new_rows.len()
    );
    Ok(())
}
