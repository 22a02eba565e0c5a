//! End-to-end pipeline test over stubbed providers: two companies, one
//! with two years of statements and a quote, one the upstream has no
//! data for.

use async_trait::async_trait;

use krx_stocks::api::{DisclosureProvider, FetchError, FetchResult, Fetched, QuoteProvider};
use krx_stocks::classifier::Exchange;
use krx_stocks::collector::FinancialDataCollector;
use krx_stocks::models::{Config, Filing, QuoteSnapshot, StatementRow, StockRecord};
use krx_stocks::report::{read_report, FINAL_REPORT_NAME};

const COMPANY_A_CORP: &str = "00126380";
const COMPANY_B_CORP: &str = "00164742";

fn row(account: &str, statement: &str, amount: &str) -> StatementRow {
    StatementRow {
        account_name: account.to_string(),
        statement_name: statement.to_string(),
        section_name: None,
        amount: amount.to_string(),
        prior_amount: None,
    }
}

struct StubDisclosure;

#[async_trait]
impl DisclosureProvider for StubDisclosure {
    async fn list_filings(&self, _corp_code: &str) -> FetchResult<Vec<Filing>> {
        Ok(Fetched::Missing)
    }

    async fn financial_statements(
        &self,
        corp_code: &str,
        year: i32,
    ) -> FetchResult<Vec<StatementRow>> {
        match (corp_code, year) {
            (COMPANY_A_CORP, 2024) => Ok(Fetched::Value(vec![
                row("영업이익", "연결재무제표", "120"),
                row("당기순이익", "연결재무제표", "100"),
                row("매출액", "연결재무제표", "1,000"),
                row("자본총계", "연결재무제표", "500,000"),
                row("부채총계", "연결재무제표", "250,000"),
            ])),
            (COMPANY_A_CORP, 2023) => Ok(Fetched::Value(vec![
                row("영업이익", "연결재무제표", "100"),
                row("당기순이익", "연결재무제표", "80"),
            ])),
            _ => Ok(Fetched::Missing),
        }
    }

    async fn financial_statements_full(
        &self,
        corp_code: &str,
        year: i32,
    ) -> FetchResult<Vec<StatementRow>> {
        match (corp_code, year) {
            (COMPANY_A_CORP, 2024) => Ok(Fetched::Value(vec![row(
                "영업활동으로인한현금흐름",
                "연결현금흐름표",
                "77,777",
            )])),
            _ => Ok(Fetched::Missing),
        }
    }

    async fn document_excerpt(&self, _receipt_no: &str) -> FetchResult<String> {
        Ok(Fetched::Missing)
    }
}

struct StubQuotes;

#[async_trait]
impl QuoteProvider for StubQuotes {
    async fn quote(&self, ticker: &str, exchange: Exchange) -> FetchResult<QuoteSnapshot> {
        assert_eq!(exchange, Exchange::Kospi);
        match ticker {
            "005930" => Ok(Fetched::Value(QuoteSnapshot {
                market_cap: Some(1_000_000),
                price_to_book: Some(2.0),
            })),
            _ => Ok(Fetched::Missing),
        }
    }
}

struct FailingDisclosure;

#[async_trait]
impl DisclosureProvider for FailingDisclosure {
    async fn list_filings(&self, _corp_code: &str) -> FetchResult<Vec<Filing>> {
        Err(FetchError::Malformed("broken".to_string()))
    }

    async fn financial_statements(
        &self,
        _corp_code: &str,
        _year: i32,
    ) -> FetchResult<Vec<StatementRow>> {
        Err(FetchError::Malformed("broken".to_string()))
    }

    async fn financial_statements_full(
        &self,
        _corp_code: &str,
        _year: i32,
    ) -> FetchResult<Vec<StatementRow>> {
        Err(FetchError::Malformed("broken".to_string()))
    }

    async fn document_excerpt(&self, _receipt_no: &str) -> FetchResult<String> {
        Err(FetchError::Malformed("broken".to_string()))
    }
}

fn test_config(output_dir: &std::path::Path) -> Config {
    Config {
        dart_api_key: "test-key".to_string(),
        registry_path: "unused.csv".to_string(),
        corp_cache_path: "unused.json".to_string(),
        output_dir: output_dir.to_string_lossy().into_owned(),
        report_year: 2024,
        rate_limit_per_minute: 6_000,
        checkpoint_interval: 50,
        max_retries: 1,
        kosdaq_boundary: 400_000,
    }
}

fn records() -> Vec<StockRecord> {
    vec![
        StockRecord {
            ticker: "005930".to_string(),
            company_name: "CompanyA".to_string(),
            corp_code: Some(COMPANY_A_CORP.to_string()),
        },
        StockRecord {
            ticker: "000660".to_string(),
            company_name: "CompanyB".to_string(),
            corp_code: Some(COMPANY_B_CORP.to_string()),
        },
    ]
}

#[tokio::test]
async fn pipeline_writes_one_row_per_company() {
    let dir = tempfile::tempdir().unwrap();
    let collector =
        FinancialDataCollector::new(StubDisclosure, StubQuotes, test_config(dir.path()));

    let (stats, report_path) = collector.run(&records()).await.unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.with_financials, 1);
    assert_eq!(stats.missing_data, 1);
    assert_eq!(stats.fetch_failures, 0);

    let report_path = report_path.unwrap();
    assert_eq!(report_path, dir.path().join(FINAL_REPORT_NAME));
    let rows = read_report(&report_path).unwrap();
    assert_eq!(rows.len(), 2);

    // Registry order is preserved in the report.
    let a = &rows[0];
    assert_eq!(a.ticker, "005930");
    assert_eq!(a.operating_profit, Some(120));
    assert_eq!(a.operating_profit_growth, Some(20.0));
    assert_eq!(a.net_income_growth, Some(25.0));
    assert_eq!(a.operating_cash_flow, Some(77_777));
    assert_eq!(a.market_cap, Some(1_000_000));
    assert_eq!(a.pbr, Some(2.0));
    assert_eq!(a.debt_ratio, Some(50.0));

    // A company the upstream has no data for still gets its row, with
    // every financial field undefined.
    let b = &rows[1];
    assert_eq!(b.ticker, "000660");
    assert_eq!(b.company_name, "CompanyB");
    assert!(!b.has_financials());
    assert_eq!(b.pbr, None);
}

#[tokio::test]
async fn pipeline_degrades_fetch_failures_to_empty_rows() {
    let dir = tempfile::tempdir().unwrap();
    let collector =
        FinancialDataCollector::new(FailingDisclosure, StubQuotes, test_config(dir.path()));

    let (stats, report_path) = collector.run(&records()).await.unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.with_financials, 0);
    // Both yearly statement fetches fail for each company.
    assert_eq!(stats.fetch_failures, 4);
    assert_eq!(stats.missing_data, 0);

    let rows = read_report(report_path.unwrap()).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| !r.has_financials()));
}
