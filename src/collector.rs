//! Sequential per-company analysis pipeline: fetch statements and a
//! quote for each joined registry record, derive ratios, and stream the
//! results into the report writer.

use std::path::PathBuf;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::analysis::build_summary;
use crate::api::{with_retry, DisclosureProvider, Fetched, QuoteProvider};
use crate::classifier::ExchangeClassifier;
use crate::models::{CompanyFinancialSummary, Config, QuoteSnapshot, StatementRow, StockRecord};
use crate::report::ReportWriter;

/// Outcome counters for one collection run.
#[derive(Debug, Default, PartialEq)]
pub struct CollectionStats {
    pub processed: usize,
    pub with_financials: usize,
    /// Companies the upstream had no statement data for.
    pub missing_data: usize,
    /// Companies whose fetches kept failing after retries.
    pub fetch_failures: usize,
}

pub struct FinancialDataCollector<D, Q> {
    disclosure: D,
    quotes: Q,
    classifier: ExchangeClassifier,
    config: Config,
}

impl<D: DisclosureProvider, Q: QuoteProvider> FinancialDataCollector<D, Q> {
    pub fn new(disclosure: D, quotes: Q, config: Config) -> Self {
        let classifier = ExchangeClassifier::new(config.kosdaq_boundary);
        Self { disclosure, quotes, classifier, config }
    }

    /// Run the pipeline over every record, sequentially. Per-company
    /// failures degrade that company's row to undefined fields; only
    /// report-write failures abort the run.
    pub async fn run(&self, records: &[StockRecord]) -> Result<(CollectionStats, Option<PathBuf>)> {
        let mut writer =
            ReportWriter::new(&self.config.output_dir, self.config.checkpoint_interval);
        let mut stats = CollectionStats::default();

        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        for record in records {
            stats.processed += 1;
            pb.set_message(record.company_name.clone());

            let summary = self.analyze_company(record, &mut stats).await;
            if summary.has_financials() {
                stats.with_financials += 1;
            }
            writer.append(summary)?;

            pb.inc(1);
            if stats.processed % 10 == 0 {
                info!(
                    "progress: {}/{} companies, {} with financials",
                    stats.processed,
                    records.len(),
                    stats.with_financials
                );
            }
        }

        pb.finish_with_message("done");
        let report_path = writer.finish()?;
        info!(
            "collection finished: {} processed, {} with financials, {} missing, {} failed",
            stats.processed, stats.with_financials, stats.missing_data, stats.fetch_failures
        );
        Ok((stats, report_path))
    }

    /// Analyze one company. Never fails: every error path degrades to an
    /// empty summary row for this company.
    async fn analyze_company(
        &self,
        record: &StockRecord,
        stats: &mut CollectionStats,
    ) -> CompanyFinancialSummary {
        let corp_code = match record.corp_code.as_deref() {
            Some(code) => code,
            None => {
                debug!("{}: no corp code, skipping fetches", record.ticker);
                stats.missing_data += 1;
                return CompanyFinancialSummary::empty(&record.ticker, &record.company_name);
            }
        };
        let year = self.config.report_year;

        let failures_before = stats.fetch_failures;
        let current = self.fetch_statement_rows(corp_code, year, record, stats).await;
        let previous = self.fetch_statement_rows(corp_code, year - 1, record, stats).await;

        if current.is_none() && previous.is_none() {
            // Only count as missing when the upstream answered; failed
            // fetches are already counted separately.
            if stats.fetch_failures == failures_before {
                stats.missing_data += 1;
            }
            return CompanyFinancialSummary::empty(&record.ticker, &record.company_name);
        }

        // The full table (cash flow) and the quote are best-effort extras.
        let full = match with_retry(self.config.max_retries, || {
            self.disclosure.financial_statements_full(corp_code, year)
        })
        .await
        {
            Ok(fetched) => fetched.into_option().unwrap_or_default(),
            Err(e) => {
                warn!("{}: cash flow fetch failed: {}", record.ticker, e);
                Vec::new()
            }
        };

        let exchange = self.classifier.classify(&record.ticker);
        let quote = match with_retry(self.config.max_retries, || {
            self.quotes.quote(&record.ticker, exchange)
        })
        .await
        {
            Ok(Fetched::Value(quote)) => quote,
            Ok(Fetched::Missing) => QuoteSnapshot::default(),
            Err(e) => {
                warn!("{}: quote fetch failed: {}", record.ticker, e);
                QuoteSnapshot::default()
            }
        };

        build_summary(
            record,
            current.as_deref().unwrap_or(&[]),
            previous.as_deref().unwrap_or(&[]),
            &full,
            &quote,
        )
    }

    async fn fetch_statement_rows(
        &self,
        corp_code: &str,
        year: i32,
        record: &StockRecord,
        stats: &mut CollectionStats,
    ) -> Option<Vec<StatementRow>> {
        match with_retry(self.config.max_retries, || {
            self.disclosure.financial_statements(corp_code, year)
        })
        .await
        {
            Ok(Fetched::Value(rows)) => Some(rows),
            Ok(Fetched::Missing) => {
                debug!("{}: no statements for {}", record.ticker, year);
                None
            }
            Err(e) => {
                warn!("{}: statement fetch for {} failed: {}", record.ticker, year, e);
                stats.fetch_failures += 1;
                None
            }
        }
    }
}
