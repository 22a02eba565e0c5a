//! Report accumulation and CSV serialization, with periodic checkpoint
//! writes so an interrupted run keeps everything already checkpointed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::models::CompanyFinancialSummary;

pub const FINAL_REPORT_NAME: &str = "종목분석결과.csv";

/// Append-only accumulator for per-company summaries. Single writer;
/// rows are never re-opened after being appended.
pub struct ReportWriter {
    out_dir: PathBuf,
    checkpoint_interval: usize,
    results: Vec<CompanyFinancialSummary>,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>, checkpoint_interval: usize) -> Self {
        Self {
            out_dir: out_dir.into(),
            checkpoint_interval: checkpoint_interval.max(1),
            results: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append one summary. Every `checkpoint_interval` rows the collection
    /// so far is flushed to an intermediate file; a killed process keeps
    /// that work.
    pub fn append(&mut self, summary: CompanyFinancialSummary) -> Result<()> {
        self.results.push(summary);
        if self.results.len() % self.checkpoint_interval == 0 {
            let path = self
                .out_dir
                .join(format!("종목분석결과_임시_{}개.csv", self.results.len()));
            write_report(&path, &self.results)?;
            info!("checkpoint: {} rows written to {}", self.results.len(), path.display());
        }
        Ok(())
    }

    /// Write the final report and log summary statistics. Returns the
    /// report path; an empty collection writes nothing.
    pub fn finish(self) -> Result<Option<PathBuf>> {
        if self.results.is_empty() {
            info!("no results to write");
            return Ok(None);
        }
        let path = self.out_dir.join(FINAL_REPORT_NAME);
        write_report(&path, &self.results)?;
        info!("wrote {} rows to {}", self.results.len(), path.display());
        log_summary_statistics(&self.results);
        Ok(Some(path))
    }
}

fn average(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let defined: Vec<f64> = values.flatten().collect();
    if defined.is_empty() {
        None
    } else {
        Some(defined.iter().sum::<f64>() / defined.len() as f64)
    }
}

fn log_summary_statistics(results: &[CompanyFinancialSummary]) {
    info!("analyzed companies: {}", results.len());
    let stats = [
        ("평균 영업이익률(%)", average(results.iter().map(|r| r.operating_profit_growth))),
        ("평균 순이익률(%)", average(results.iter().map(|r| r.net_income_growth))),
        ("평균 매출변동률(%)", average(results.iter().map(|r| r.revenue_growth))),
        ("평균 PBR", average(results.iter().map(|r| r.pbr))),
        ("평균 PER", average(results.iter().map(|r| r.per))),
        ("평균 ROE(%)", average(results.iter().map(|r| r.roe))),
        ("평균 부채비율(%)", average(results.iter().map(|r| r.debt_ratio))),
    ];
    for (label, value) in stats {
        if let Some(v) = value {
            info!("{}: {:.2}", label, v);
        }
    }
}

/// Serialize summaries to a CSV file, creating the directory as needed.
/// A write failure here is fatal for the run.
pub fn write_report(path: impl AsRef<Path>, results: &[CompanyFinancialSummary]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create report {}", path.display()))?;
    for summary in results {
        writer.serialize(summary)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a report back into memory.
pub fn read_report(path: impl AsRef<Path>) -> Result<Vec<CompanyFinancialSummary>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open report {}", path.display()))?;
    let mut results = Vec::new();
    for row in reader.deserialize() {
        results.push(row.with_context(|| format!("malformed report row in {}", path.display()))?);
    }
    Ok(results)
}

/// Write a simple per-company label report (audit opinions, control
/// assessments). The value column header carries the report year, so the
/// header is assembled by hand rather than via serde.
pub fn write_label_report(
    path: impl AsRef<Path>,
    year: i32,
    value_header_suffix: &str,
    rows: &[(String, String, String)],
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create report {}", path.display()))?;
    let value_header = format!("{}년 {}", year, value_header_suffix);
    writer.write_record(["종목코드", "종목명", value_header.as_str()])?;
    for (ticker, name, label) in rows {
        writer.write_record([ticker, name, label])?;
    }
    writer.flush()?;
    Ok(())
}
