//! Classify every registry entry as KOSPI or KOSDAQ by its code range and
//! write a combined listing plus one file per exchange.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use krx_stocks::classifier::{is_investment_vehicle, Exchange, ExchangeClassifier};
use krx_stocks::models::{Config, RegistryRow};
use krx_stocks::registry::load_stock_registry;

#[derive(Parser)]
#[command(
    name = "classify-exchanges",
    about = "Split the stock registry into KOSPI and KOSDAQ listings by code range"
)]
struct Args {
    /// Stock registry CSV (overrides REGISTRY_PATH)
    #[arg(long)]
    registry: Option<String>,

    /// Output directory (overrides OUTPUT_DIR)
    #[arg(long)]
    output: Option<String>,

    /// Keep funds, trusts and other investment vehicles in the output
    #[arg(long)]
    keep_vehicles: bool,
}

/// 100000-wide code bucket label, e.g. "000000-099999". Non-numeric and
/// out-of-range codes have no bucket.
fn range_label(code: &str) -> Option<String> {
    let n: u32 = code.trim().parse().ok()?;
    if n > 999_999 {
        return None;
    }
    let lo = n / 100_000 * 100_000;
    Some(format!("{:06}-{:06}", lo, lo + 99_999))
}

fn range_distribution<'a>(codes: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut buckets = BTreeMap::new();
    for code in codes {
        if let Some(label) = range_label(code) {
            *buckets.entry(label).or_insert(0) += 1;
        }
    }
    buckets
}

fn write_listing(path: &Path, rows: &[(&RegistryRow, Exchange)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(["종목코드", "종목명", "거래소"])?;
    for (row, exchange) in rows {
        writer.write_record([row.comp_code.as_str(), row.comp_name.as_str(), exchange.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let registry_path = args.registry.unwrap_or(config.registry_path);
    let out_dir = args.output.unwrap_or(config.output_dir);

    let rows = load_stock_registry(&registry_path)?;
    let classifier = ExchangeClassifier::new(config.kosdaq_boundary);

    let mut skipped_vehicles = 0usize;
    let mut classified: Vec<(&RegistryRow, Exchange)> = Vec::new();
    for row in &rows {
        if !args.keep_vehicles && is_investment_vehicle(&row.comp_name) {
            skipped_vehicles += 1;
            continue;
        }
        classified.push((row, classifier.classify(&row.comp_code)));
    }
    if skipped_vehicles > 0 {
        info!("skipped {} investment vehicles", skipped_vehicles);
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, exchange) in &classified {
        *counts.entry(exchange.as_str()).or_insert(0) += 1;
    }
    for (exchange, count) in &counts {
        info!("{}: {} companies", exchange, count);
    }
    let distribution =
        range_distribution(classified.iter().map(|(row, _)| row.comp_code.as_str()));
    for (range, count) in &distribution {
        info!("code range {}: {} companies", range, count);
    }

    let out_dir = Path::new(&out_dir);
    write_listing(&out_dir.join("거래소구분.csv"), &classified)?;
    for (exchange, file) in [
        (Exchange::Kospi, "코스피_종목.csv"),
        (Exchange::Kosdaq, "코스닥_종목.csv"),
        (Exchange::Other, "기타_종목.csv"),
    ] {
        let subset: Vec<(&RegistryRow, Exchange)> = classified
            .iter()
            .filter(|(_, e)| *e == exchange)
            .copied()
            .collect();
        if !subset.is_empty() {
            write_listing(&out_dir.join(file), &subset)?;
        }
    }
    info!("wrote exchange listings to {}", out_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_label_buckets_by_hundred_thousands() {
        assert_eq!(range_label("005930").as_deref(), Some("000000-099999"));
        assert_eq!(range_label("099999").as_deref(), Some("000000-099999"));
        assert_eq!(range_label("100000").as_deref(), Some("100000-199999"));
        assert_eq!(range_label("999999").as_deref(), Some("900000-999999"));
    }

    #[test]
    fn test_range_label_rejects_non_codes() {
        assert_eq!(range_label("00593K"), None);
        assert_eq!(range_label("1000000"), None);
        assert_eq!(range_label(""), None);
    }

    #[test]
    fn test_range_distribution_counts_per_bucket() {
        let codes = ["005930", "060310", "100840", "00593K"];
        let buckets = range_distribution(codes.into_iter());
        assert_eq!(buckets.get("000000-099999"), Some(&2));
        assert_eq!(buckets.get("100000-199999"), Some(&1));
        assert_eq!(buckets.len(), 2);
    }
}
