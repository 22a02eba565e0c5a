use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A listed company after joining the local registry against the
/// corporate directory cache. Immutable once joined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRecord {
    /// Fixed 6-digit, zero-padded stock code.
    pub ticker: String,
    pub company_name: String,
    /// Internal DART company identifier, resolved from the directory cache.
    pub corp_code: Option<String>,
}

/// Raw row of the local stock-code registry file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRow {
    #[serde(rename = "COMP_CODE")]
    pub comp_code: String,
    #[serde(rename = "COMP_NAME")]
    pub comp_name: String,
    #[serde(rename = "CORP_CODE", default, skip_serializing_if = "Option::is_none")]
    pub corp_code: Option<String>,
}

/// One row of the cached corporate-directory snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpDirectoryEntry {
    pub corp_code: String,
    pub corp_name: String,
    pub stock_code: Option<String>,
}

/// One disclosure returned by the filing-list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filing {
    pub report_name: String,
    pub receipt_no: String,
    /// Receipt date as YYYYMMDD, as the API returns it.
    pub receipt_date: String,
}

impl Filing {
    /// Four-digit receipt year, when the receipt date is well-formed.
    pub fn receipt_year(&self) -> Option<&str> {
        if self.receipt_date.len() >= 4 && self.receipt_date.is_char_boundary(4) {
            Some(&self.receipt_date[..4])
        } else {
            None
        }
    }

    pub fn receipt_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.receipt_date, "%Y%m%d").ok()
    }
}

/// One row of a fetched financial statement table. Field names follow the
/// DART single-account response (account_nm / fs_nm / sj_nm / thstrm_amount).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRow {
    /// Line-item label, e.g. "영업이익".
    pub account_name: String,
    /// Statement-type label, e.g. "연결재무제표" or "연결현금흐름표".
    pub statement_name: String,
    /// Sub-statement label (balance sheet vs income statement), when present.
    pub section_name: Option<String>,
    /// Current-period amount with thousands separators, e.g. "6,408,958,000,000".
    pub amount: String,
    /// Prior-period amount, when the endpoint returns one.
    pub prior_amount: Option<String>,
}

/// Market snapshot for one ticker from the quotes collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSnapshot {
    pub market_cap: Option<i64>,
    pub price_to_book: Option<f64>,
}

/// Per-company analysis result. Append-only: built once, written once.
/// Serialized column headers are Korean, matching the existing report
/// files downstream consumers read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyFinancialSummary {
    #[serde(rename = "종목코드")]
    pub ticker: String,
    #[serde(rename = "종목명")]
    pub company_name: String,
    #[serde(rename = "당기 영업이익")]
    pub operating_profit: Option<i64>,
    #[serde(rename = "전기 영업이익")]
    pub operating_profit_prev: Option<i64>,
    #[serde(rename = "전년도대비 영업이익률(%)")]
    pub operating_profit_growth: Option<f64>,
    #[serde(rename = "당기 당기순이익")]
    pub net_income: Option<i64>,
    #[serde(rename = "전기 당기순이익")]
    pub net_income_prev: Option<i64>,
    #[serde(rename = "전년도대비 순이익률(%)")]
    pub net_income_growth: Option<f64>,
    #[serde(rename = "당기 매출액")]
    pub revenue: Option<i64>,
    #[serde(rename = "전기 매출액")]
    pub revenue_prev: Option<i64>,
    #[serde(rename = "전년도대비 매출변동률(%)")]
    pub revenue_growth: Option<f64>,
    #[serde(rename = "자기자본")]
    pub equity: Option<i64>,
    #[serde(rename = "부채총계")]
    pub total_liabilities: Option<i64>,
    #[serde(rename = "영업현금흐름")]
    pub operating_cash_flow: Option<i64>,
    #[serde(rename = "시가총액")]
    pub market_cap: Option<i64>,
    #[serde(rename = "PBR")]
    pub pbr: Option<f64>,
    #[serde(rename = "PER")]
    pub per: Option<f64>,
    #[serde(rename = "ROE(%)")]
    pub roe: Option<f64>,
    #[serde(rename = "부채비율(%)")]
    pub debt_ratio: Option<f64>,
}

impl CompanyFinancialSummary {
    /// A row with every financial field undefined, for companies the
    /// upstream API has no data for.
    pub fn empty(ticker: &str, company_name: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            company_name: company_name.to_string(),
            operating_profit: None,
            operating_profit_prev: None,
            operating_profit_growth: None,
            net_income: None,
            net_income_prev: None,
            net_income_growth: None,
            revenue: None,
            revenue_prev: None,
            revenue_growth: None,
            equity: None,
            total_liabilities: None,
            operating_cash_flow: None,
            market_cap: None,
            pbr: None,
            per: None,
            roe: None,
            debt_ratio: None,
        }
    }

    pub fn has_financials(&self) -> bool {
        self.operating_profit.is_some() || self.net_income.is_some() || self.revenue.is_some()
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub dart_api_key: String,
    pub registry_path: String,
    pub corp_cache_path: String,
    pub output_dir: String,
    pub report_year: i32,
    pub rate_limit_per_minute: u32,
    pub checkpoint_interval: usize,
    pub max_retries: u32,
    /// Lowest code classified as KOSDAQ. Data sources disagree on this
    /// split (300000 vs 400000), so it is an explicit setting rather
    /// than a constant.
    pub kosdaq_boundary: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            dart_api_key: std::env::var("DART_API_KEY")
                .map_err(|_| anyhow::anyhow!("DART_API_KEY environment variable required"))?,
            registry_path: std::env::var("REGISTRY_PATH")
                .unwrap_or_else(|_| "stock_codes.csv".to_string()),
            corp_cache_path: std::env::var("CORP_CACHE_PATH")
                .unwrap_or_else(|_| "docs_cache/corp_codes.json".to_string()),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "doc".to_string()),
            report_year: std::env::var("REPORT_YEAR")
                .unwrap_or_else(|_| "2024".to_string())
                .parse()
                .unwrap_or(2024),
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            checkpoint_interval: std::env::var("CHECKPOINT_INTERVAL")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            max_retries: std::env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            kosdaq_boundary: std::env::var("KOSDAQ_BOUNDARY")
                .unwrap_or_else(|_| "400000".to_string())
                .parse()
                .unwrap_or(400_000),
        })
    }
}
