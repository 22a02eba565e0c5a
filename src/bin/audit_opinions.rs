//! Infer each company's audit opinion from its recent disclosure titles
//! and write a per-company opinion report.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use krx_stocks::api::{with_retry, DartClient, DisclosureProvider, Fetched};
use krx_stocks::classifier::{classify_audit_opinion, AuditOpinion};
use krx_stocks::models::Config;
use krx_stocks::registry::{join_registry, load_corp_directory, load_stock_registry};
use krx_stocks::report::write_label_report;

#[derive(Parser)]
#[command(
    name = "audit-opinions",
    about = "Classify audit opinions from disclosure titles for every registry company"
)]
struct Args {
    /// Only process the first N companies
    #[arg(long)]
    limit: Option<usize>,

    /// Output directory (overrides OUTPUT_DIR)
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
    let config = Config::from_env()?;
    let out_dir = args.output.clone().unwrap_or_else(|| config.output_dir.clone());

    let registry = load_stock_registry(&config.registry_path)?;
    let directory = load_corp_directory(&config.corp_cache_path)?;
    let mut records = join_registry(&registry, &directory);
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }
    info!("classifying audit opinions for {} companies", records.len());

    let client = DartClient::new(&config)?;
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        pb.set_message(record.company_name.clone());
        let corp_code = record.corp_code.as_deref().unwrap_or_default();
        // A failed fetch is not the same as an empty filing list; it gets
        // its own label instead of reading as "no disclosures".
        let label = match with_retry(config.max_retries, || client.list_filings(corp_code)).await
        {
            Ok(Fetched::Value(filings)) => classify_audit_opinion(&filings).to_string(),
            Ok(Fetched::Missing) => classify_audit_opinion(&[]).to_string(),
            Err(e) => {
                warn!("{}: filing list fetch failed: {}", record.ticker, e);
                AuditOpinion::FetchFailed.to_string()
            }
        };
        rows.push((record.ticker.clone(), record.company_name.clone(), label));
        pb.inc(1);
    }
    pb.finish();

    let path = Path::new(&out_dir).join("내부감사의견.csv");
    write_label_report(&path, config.report_year, "내부감사의견", &rows)?;
    info!("wrote {} opinions to {}", rows.len(), path.display());
    Ok(())
}
