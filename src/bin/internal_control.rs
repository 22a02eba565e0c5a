//! Infer each company's internal-control assessment from its latest
//! business report title and a body excerpt, and write a per-company
//! assessment report.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use krx_stocks::api::{with_retry, DartClient, DisclosureProvider, Fetched};
use krx_stocks::classifier::{classify_internal_control, ControlAssessment, BUSINESS_REPORT_MARKER};
use krx_stocks::models::{Config, Filing};
use krx_stocks::registry::{join_registry, load_corp_directory, load_stock_registry};
use krx_stocks::report::write_label_report;

#[derive(Parser)]
#[command(
    name = "internal-control",
    about = "Classify internal-control assessments from business reports for every registry company"
)]
struct Args {
    /// Only process the first N companies
    #[arg(long)]
    limit: Option<usize>,

    /// Output directory (overrides OUTPUT_DIR)
    #[arg(long)]
    output: Option<String>,

    /// Classify from titles only, without fetching report bodies
    #[arg(long)]
    no_excerpts: bool,
}

/// Most recent business report, by receipt date.
fn latest_business_report(filings: &[Filing]) -> Option<&Filing> {
    filings
        .iter()
        .filter(|f| f.report_name.contains(BUSINESS_REPORT_MARKER))
        .max_by(|a, b| a.receipt_date.cmp(&b.receipt_date))
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
    info!(
        "classifying internal-control assessments for {} companies",
        records.len()
    );

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
        let filings = match with_retry(config.max_retries, || client.list_filings(corp_code)).await
        {
            Ok(Fetched::Value(filings)) => filings,
            Ok(Fetched::Missing) => Vec::new(),
            Err(e) => {
                warn!("{}: filing list fetch failed: {}", record.ticker, e);
                rows.push((
                    record.ticker.clone(),
                    record.company_name.clone(),
                    ControlAssessment::FetchFailed.to_string(),
                ));
                pb.inc(1);
                continue;
            }
        };

        // Body excerpts are best-effort: a fetch failure falls back to
        // title-only classification.
        let mut excerpt = None;
        if !args.no_excerpts {
            if let Some(report) = latest_business_report(&filings) {
                match with_retry(config.max_retries, || {
                    client.document_excerpt(&report.receipt_no)
                })
                .await
                {
                    Ok(Fetched::Value(body)) => excerpt = Some(body),
                    Ok(Fetched::Missing) => {}
                    Err(e) => warn!("{}: excerpt fetch failed: {}", record.ticker, e),
                }
            }
        }

        let classified = classify_internal_control(&filings, excerpt.as_deref());
        rows.push((
            record.ticker.clone(),
            record.company_name.clone(),
            classified.to_string(),
        ));
        pb.inc(1);
    }
    pb.finish();

    let path = Path::new(&out_dir).join("내부회계관리제도.csv");
    write_label_report(&path, config.report_year, "내부회계관리제도 평가", &rows)?;
    info!("wrote {} assessments to {}", rows.len(), path.display());
    Ok(())
}
