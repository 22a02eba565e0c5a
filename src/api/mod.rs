use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use thiserror::Error;

use crate::classifier::Exchange;
use crate::models::{Filing, QuoteSnapshot, StatementRow};

pub mod dart_client;
pub mod quote_client;
pub use dart_client::DartClient;
pub use quote_client::YahooQuoteClient;

/// Failure taxonomy for collaborator calls. Transient failures (network,
/// 5xx, API-side rate limiting) are worth retrying; malformed responses
/// are not.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient fetch failure: {0}")]
    Transient(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Distinguishes a value the upstream returned from data the upstream
/// simply does not have. Fetch *failures* are a separate `FetchError`.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Value(T),
    Missing,
}

impl<T> Fetched<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Fetched::Value(v) => Some(v),
            Fetched::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Fetched::Missing)
    }
}

pub type FetchResult<T> = std::result::Result<Fetched<T>, FetchError>;

/// Token-bucket rate limiter for API requests, with a small jitter so
/// call bursts do not land on exact bucket edges.
pub struct ApiRateLimiter {
    limiter: DefaultDirectRateLimiter,
    jitter: Jitter,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute.max(1)).unwrap();
        Self {
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            jitter: Jitter::up_to(Duration::from_millis(250)),
        }
    }

    pub async fn wait(&self) {
        self.limiter.until_ready_with_jitter(self.jitter).await;
    }
}

/// Disclosure-API collaborator: filing lists, structured financial
/// statements, and raw document content.
#[async_trait]
pub trait DisclosureProvider: Send + Sync {
    /// List recent filings for a company.
    async fn list_filings(&self, corp_code: &str) -> FetchResult<Vec<Filing>>;

    /// Single-account financial statement summary for a business year.
    async fn financial_statements(&self, corp_code: &str, year: i32) -> FetchResult<Vec<StatementRow>>;

    /// Full financial statement table for a business year, including the
    /// cash flow statement.
    async fn financial_statements_full(&self, corp_code: &str, year: i32)
        -> FetchResult<Vec<StatementRow>>;

    /// Short plain-text excerpt of a filed document's body.
    async fn document_excerpt(&self, receipt_no: &str) -> FetchResult<String>;
}

/// Market-quotes collaborator: market capitalization and price-to-book
/// for a ticker on a given exchange.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, ticker: &str, exchange: Exchange) -> FetchResult<QuoteSnapshot>;
}

/// Retry a fallible fetch with bounded exponential backoff. Only
/// transient errors are retried; the jitter keeps retries from multiple
/// runs from synchronizing.
pub async fn with_retry<T, F, Fut>(max_retries: u32, mut call: F) -> FetchResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = FetchResult<T>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                let base = Duration::from_millis(500 * 2u64.pow(attempt));
                let jitter = Duration::from_millis(rand::random::<u64>() % 250);
                tracing::warn!(
                    "retrying after transient error (attempt {}/{}): {}",
                    attempt + 1,
                    max_retries,
                    err
                );
                tokio::time::sleep(base + jitter).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_rate_limiter_allows_first_request_immediately() {
        let limiter = ApiRateLimiter::new(600);
        let start = std::time::Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_transient_errors() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(3, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FetchError::Transient("socket closed".to_string()))
                } else {
                    Ok(Fetched::Value(7))
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), Fetched::Value(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_on_malformed() {
        let attempts = AtomicU32::new(0);
        let result: FetchResult<i32> = with_retry(3, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::Malformed("not json".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fetched_into_option() {
        assert_eq!(Fetched::Value(1).into_option(), Some(1));
        assert_eq!(Fetched::<i32>::Missing.into_option(), None);
    }
}
