use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use krx_stocks::api::{DartClient, YahooQuoteClient};
use krx_stocks::collector::FinancialDataCollector;
use krx_stocks::models::Config;
use krx_stocks::registry::{join_registry, load_corp_directory, load_stock_registry};

#[derive(Parser)]
#[command(
    name = "krx-stocks",
    about = "Analyze financial statements and valuation ratios for every company in the stock registry"
)]
struct Args {
    /// Business year to analyze (overrides REPORT_YEAR)
    #[arg(long)]
    year: Option<i32>,

    /// Only analyze the first N companies
    #[arg(long)]
    limit: Option<usize>,

    /// Stock registry CSV (overrides REGISTRY_PATH)
    #[arg(long)]
    registry: Option<String>,

    /// Output directory for reports (overrides OUTPUT_DIR)
    #[arg(long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(year) = args.year {
        config.report_year = year;
    }
    if let Some(registry) = args.registry {
        config.registry_path = registry;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    info!("analyzing business year {}", config.report_year);

    let rows = load_stock_registry(&config.registry_path)?;
    let directory = load_corp_directory(&config.corp_cache_path)?;
    let mut records = join_registry(&rows, &directory);
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }
    info!("{} companies to analyze", records.len());

    let disclosure = DartClient::new(&config)?;
    let quotes = YahooQuoteClient::new(&config)?;
    let collector = FinancialDataCollector::new(disclosure, quotes, config);
    let (stats, report_path) = collector.run(&records).await?;

    if let Some(path) = report_path {
        info!("report written to {}", path.display());
    }
    info!(
        "{} companies processed, {} with financials, {} without data, {} fetch failures",
        stats.processed, stats.with_financials, stats.missing_data, stats.fetch_failures
    );
    Ok(())
}
