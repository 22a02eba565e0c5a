use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::classifier::Exchange;
use crate::models::{Config, QuoteSnapshot};

use super::{ApiRateLimiter, FetchError, FetchResult, Fetched, QuoteProvider};

const DEFAULT_BASE: &str = "https://query1.finance.yahoo.com";

/// Quote-summary client. Korean tickers are quoted under exchange
/// suffixes (`005930.KS`, `247540.KQ`); codes classified as `Other` have
/// no quotable symbol and come back as `Missing`.
pub struct YahooQuoteClient {
    client: Client,
    base_url: String,
    rate_limiter: ApiRateLimiter,
}

impl YahooQuoteClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("krx-stocks/1.0")
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE.to_string(),
            rate_limiter: ApiRateLimiter::new(config.rate_limit_per_minute),
        })
    }

    /// Point the client at a different host (tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn parse_snapshot(json: &Value) -> Option<QuoteSnapshot> {
        let result = json
            .get("quoteSummary")
            .and_then(|q| q.get("result"))
            .and_then(|r| r.as_array())
            .and_then(|arr| arr.first())?;

        let market_cap = result
            .get("price")
            .and_then(|p| p.get("marketCap"))
            .and_then(|m| m.get("raw"))
            .and_then(|v| v.as_i64());
        let price_to_book = result
            .get("defaultKeyStatistics")
            .and_then(|s| s.get("priceToBook"))
            .and_then(|p| p.get("raw"))
            .and_then(|v| v.as_f64());

        Some(QuoteSnapshot { market_cap, price_to_book })
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteClient {
    async fn quote(&self, ticker: &str, exchange: Exchange) -> FetchResult<QuoteSnapshot> {
        let suffix = match exchange.ticker_suffix() {
            Some(suffix) => suffix,
            None => return Ok(Fetched::Missing),
        };

        self.rate_limiter.wait().await;
        let url = format!(
            "{}/v10/finance/quoteSummary/{}{}?modules=price,defaultKeyStatistics",
            self.base_url, ticker, suffix
        );
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() || e.is_request() {
                FetchError::Transient(e.to_string())
            } else {
                FetchError::Malformed(e.to_string())
            }
        })?;
        let status = response.status();
        // The quote endpoint answers unknown symbols with 404
        if status.as_u16() == 404 {
            return Ok(Fetched::Missing);
        }
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(FetchError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(FetchError::Malformed(format!("HTTP {}", status)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(format!("undecodable quote body: {}", e)))?;

        match Self::parse_snapshot(&json) {
            Some(snapshot) => Ok(Fetched::Value(snapshot)),
            None => Ok(Fetched::Missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        let json = serde_json::json!({
            "quoteSummary": {
                "result": [{
                    "price": { "marketCap": { "raw": 400_000_000_000_000i64, "fmt": "400T" } },
                    "defaultKeyStatistics": { "priceToBook": { "raw": 1.42, "fmt": "1.42" } }
                }],
                "error": null
            }
        });
        let snapshot = YahooQuoteClient::parse_snapshot(&json).unwrap();
        assert_eq!(snapshot.market_cap, Some(400_000_000_000_000));
        assert_eq!(snapshot.price_to_book, Some(1.42));
    }

    #[test]
    fn test_parse_snapshot_empty_result() {
        let json = serde_json::json!({
            "quoteSummary": { "result": [], "error": null }
        });
        assert!(YahooQuoteClient::parse_snapshot(&json).is_none());
    }

    #[test]
    fn test_parse_snapshot_partial_fields() {
        let json = serde_json::json!({
            "quoteSummary": {
                "result": [{ "price": {} }],
                "error": null
            }
        });
        let snapshot = YahooQuoteClient::parse_snapshot(&json).unwrap();
        assert_eq!(snapshot.market_cap, None);
        assert_eq!(snapshot.price_to_book, None);
    }
}
