use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::models::{Config, Filing, StatementRow};

use super::{ApiRateLimiter, DisclosureProvider, FetchError, FetchResult, Fetched};

const DEFAULT_API_BASE: &str = "https://opendart.fss.or.kr/api";
const DEFAULT_VIEWER_BASE: &str = "https://dart.fss.or.kr";

/// Annual-report code for the single-account endpoints.
const ANNUAL_REPORT_CODE: &str = "11011";

/// How much of a document body the excerpt keeps.
const EXCERPT_CHARS: usize = 2000;

/// Client for the DART OpenAPI disclosure endpoints. Responses are JSON
/// envelopes with a status field; `013`/`014` mean the company simply has
/// no data for the query and are surfaced as `Fetched::Missing`.
pub struct DartClient {
    client: Client,
    api_key: String,
    api_base: String,
    viewer_base: String,
    rate_limiter: ApiRateLimiter,
}

impl DartClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("krx-stocks/1.0")
            .build()?;

        Ok(Self {
            client,
            api_key: config.dart_api_key.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
            viewer_base: DEFAULT_VIEWER_BASE.to_string(),
            rate_limiter: ApiRateLimiter::new(config.rate_limit_per_minute),
        })
    }

    /// Point the client at different hosts (tests).
    pub fn with_base_urls(mut self, api_base: &str, viewer_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.viewer_base = viewer_base.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, name: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!("{}/{}", self.api_base, name))
            .map_err(|e| FetchError::Malformed(format!("bad endpoint url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("crtfc_key", &self.api_key)
            .extend_pairs(params);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        self.rate_limiter.wait().await;
        debug!("GET {}", redact_key(url.as_str()));

        let response = self.client.get(url).send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(FetchError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(FetchError::Malformed(format!("HTTP {}", status)));
        }
        response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(format!("undecodable JSON body: {}", e)))
    }

    /// Unwrap the DART response envelope. `Ok(None)` means the upstream
    /// has no data for this query.
    fn check_envelope(json: &Value) -> Result<Option<()>, FetchError> {
        let status = json
            .get("status")
            .and_then(|s| s.as_str())
            .ok_or_else(|| FetchError::Malformed("response has no status field".to_string()))?;
        let message = json.get("message").and_then(|m| m.as_str()).unwrap_or("");
        match status {
            "000" => Ok(Some(())),
            "013" | "014" => Ok(None),
            "020" | "021" => Err(FetchError::Transient(format!(
                "API rate limit ({}): {}",
                status, message
            ))),
            other => Err(FetchError::Malformed(format!(
                "API error status {}: {}",
                other, message
            ))),
        }
    }

    fn rows_from_list(json: &Value) -> Vec<StatementRow> {
        let mut rows = Vec::new();
        if let Some(items) = json.get("list").and_then(|l| l.as_array()) {
            for item in items {
                let account_name = str_field(item, "account_nm");
                let amount = str_field(item, "thstrm_amount");
                // fs_nm is absent on the full-table endpoint; sj_nm still
                // identifies the statement there.
                let statement_name = item
                    .get("fs_nm")
                    .and_then(|v| v.as_str())
                    .or_else(|| item.get("sj_nm").and_then(|v| v.as_str()))
                    .unwrap_or_default()
                    .to_string();
                rows.push(StatementRow {
                    account_name,
                    statement_name,
                    section_name: item
                        .get("sj_nm")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    amount,
                    prior_amount: item
                        .get("frmtrm_amount")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                });
            }
        }
        rows
    }

    async fn fetch_statements(&self, endpoint: &str, corp_code: &str, year: i32)
        -> FetchResult<Vec<StatementRow>>
    {
        let year_str = year.to_string();
        let url = self.endpoint(
            endpoint,
            &[
                ("corp_code", corp_code),
                ("bsns_year", &year_str),
                ("reprt_code", ANNUAL_REPORT_CODE),
                ("fs_div", "CFS"),
            ],
        )?;
        let json = self.get_json(url).await?;
        match Self::check_envelope(&json)? {
            Some(()) => {
                let rows = Self::rows_from_list(&json);
                debug!("{}: {} statement rows for {}", endpoint, rows.len(), corp_code);
                Ok(Fetched::Value(rows))
            }
            None => Ok(Fetched::Missing),
        }
    }
}

fn str_field(item: &Value, key: &str) -> String {
    item.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

fn classify_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        FetchError::Transient(err.to_string())
    } else {
        FetchError::Malformed(err.to_string())
    }
}

fn redact_key(url: &str) -> String {
    match url.split_once("crtfc_key=") {
        Some((before, after)) => {
            let rest = after.split_once('&').map(|(_, r)| r).unwrap_or("");
            if rest.is_empty() {
                format!("{}crtfc_key=***", before)
            } else {
                format!("{}crtfc_key=***&{}", before, rest)
            }
        }
        None => url.to_string(),
    }
}

/// Crude tag stripper for document-viewer HTML; enough for keyword
/// matching over the body text.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[async_trait]
impl DisclosureProvider for DartClient {
    async fn list_filings(&self, corp_code: &str) -> FetchResult<Vec<Filing>> {
        let url = self.endpoint(
            "list.json",
            &[("corp_code", corp_code), ("page_count", "100")],
        )?;
        let json = self.get_json(url).await?;
        match Self::check_envelope(&json)? {
            Some(()) => {
                let mut filings = Vec::new();
                if let Some(items) = json.get("list").and_then(|l| l.as_array()) {
                    for item in items {
                        filings.push(Filing {
                            report_name: str_field(item, "report_nm"),
                            receipt_no: str_field(item, "rcept_no"),
                            receipt_date: str_field(item, "rcept_dt"),
                        });
                    }
                }
                debug!("list.json: {} filings for {}", filings.len(), corp_code);
                Ok(Fetched::Value(filings))
            }
            None => Ok(Fetched::Missing),
        }
    }

    async fn financial_statements(&self, corp_code: &str, year: i32)
        -> FetchResult<Vec<StatementRow>>
    {
        self.fetch_statements("fnlttSinglAcnt.json", corp_code, year).await
    }

    async fn financial_statements_full(&self, corp_code: &str, year: i32)
        -> FetchResult<Vec<StatementRow>>
    {
        self.fetch_statements("fnlttSinglAcntAll.json", corp_code, year).await
    }

    async fn document_excerpt(&self, receipt_no: &str) -> FetchResult<String> {
        self.rate_limiter.wait().await;
        let url = format!("{}/dsaf001/main.do?rcpNo={}", self.viewer_base, receipt_no);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(Fetched::Missing);
        }
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(FetchError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(FetchError::Malformed(format!("HTTP {}", status)));
        }
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Malformed(format!("unreadable body: {}", e)))?;
        let text = strip_tags(&body);
        let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
        if excerpt.trim().is_empty() {
            return Ok(Fetched::Missing);
        }
        Ok(Fetched::Value(excerpt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_statuses() {
        let ok: Value = serde_json::json!({"status": "000", "message": "정상"});
        assert!(DartClient::check_envelope(&ok).unwrap().is_some());

        let missing: Value = serde_json::json!({"status": "013", "message": "조회된 데이타가 없습니다."});
        assert!(DartClient::check_envelope(&missing).unwrap().is_none());

        let limited: Value = serde_json::json!({"status": "020", "message": "요청 제한을 초과하였습니다."});
        assert!(matches!(
            DartClient::check_envelope(&limited),
            Err(FetchError::Transient(_))
        ));

        let bad_key: Value = serde_json::json!({"status": "010", "message": "등록되지 않은 키입니다."});
        assert!(matches!(
            DartClient::check_envelope(&bad_key),
            Err(FetchError::Malformed(_))
        ));

        let no_status: Value = serde_json::json!({"message": "?"});
        assert!(DartClient::check_envelope(&no_status).is_err());
    }

    #[test]
    fn test_rows_from_list_prefers_fs_nm() {
        let json = serde_json::json!({
            "status": "000",
            "list": [
                {
                    "account_nm": "영업이익",
                    "fs_nm": "연결재무제표",
                    "sj_nm": "손익계산서",
                    "thstrm_amount": "6,408,958",
                    "frmtrm_amount": "4,301,222"
                },
                {
                    "account_nm": "영업활동으로인한현금흐름",
                    "sj_nm": "연결현금흐름표",
                    "thstrm_amount": "12,345"
                }
            ]
        });
        let rows = DartClient::rows_from_list(&json);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].statement_name, "연결재무제표");
        assert_eq!(rows[0].prior_amount.as_deref(), Some("4,301,222"));
        assert_eq!(rows[1].statement_name, "연결현금흐름표");
    }

    #[test]
    fn test_strip_tags() {
        let html = "<html><body><p>내부회계관리제도는 효과적으로 운영</p></body></html>";
        let text = strip_tags(html);
        assert!(text.contains("내부회계관리제도는 효과적으로 운영"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_redact_key() {
        let url = "https://opendart.fss.or.kr/api/list.json?crtfc_key=secret&corp_code=1";
        let redacted = redact_key(url);
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("corp_code=1"));
    }
}
