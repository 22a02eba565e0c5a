//! HTTP-level tests for the disclosure and quote clients against a mock
//! server.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use krx_stocks::api::{DartClient, DisclosureProvider, FetchError, Fetched, QuoteProvider, YahooQuoteClient};
use krx_stocks::classifier::Exchange;
use krx_stocks::models::Config;

fn test_config() -> Config {
    Config {
        dart_api_key: "test-key".to_string(),
        registry_path: "unused.csv".to_string(),
        corp_cache_path: "unused.json".to_string(),
        output_dir: "unused".to_string(),
        report_year: 2024,
        rate_limit_per_minute: 6_000,
        checkpoint_interval: 50,
        max_retries: 0,
        kosdaq_boundary: 400_000,
    }
}

async fn dart_client(server: &MockServer) -> DartClient {
    DartClient::new(&test_config())
        .unwrap()
        .with_base_urls(&server.uri(), &server.uri())
}

#[tokio::test]
async fn financial_statements_parses_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fnlttSinglAcnt.json"))
        .and(query_param("crtfc_key", "test-key"))
        .and(query_param("corp_code", "00126380"))
        .and(query_param("bsns_year", "2024"))
        .and(query_param("reprt_code", "11011"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "000",
            "message": "정상",
            "list": [{
                "account_nm": "영업이익",
                "fs_nm": "연결재무제표",
                "sj_nm": "손익계산서",
                "thstrm_amount": "6,408,958",
                "frmtrm_amount": "4,301,222"
            }]
        })))
        .mount(&server)
        .await;

    let client = dart_client(&server).await;
    let fetched = client.financial_statements("00126380", 2024).await.unwrap();
    let rows = match fetched {
        Fetched::Value(rows) => rows,
        Fetched::Missing => panic!("expected rows"),
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].account_name, "영업이익");
    assert_eq!(rows[0].statement_name, "연결재무제표");
    assert_eq!(rows[0].amount, "6,408,958");
}

#[tokio::test]
async fn no_data_status_is_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fnlttSinglAcnt.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "013",
            "message": "조회된 데이타가 없습니다."
        })))
        .mount(&server)
        .await;

    let client = dart_client(&server).await;
    let fetched = client.financial_statements("00999999", 2024).await.unwrap();
    assert!(fetched.is_missing());
}

#[tokio::test]
async fn server_errors_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = dart_client(&server).await;
    let err = client.list_filings("00126380").await.unwrap_err();
    assert!(matches!(err, FetchError::Transient(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn list_filings_parses_receipts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list.json"))
        .and(query_param("corp_code", "00126380"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "000",
            "message": "정상",
            "list": [{
                "report_nm": "사업보고서 (2024.12)",
                "rcept_no": "20250312000123",
                "rcept_dt": "20250312"
            }]
        })))
        .mount(&server)
        .await;

    let client = dart_client(&server).await;
    let filings = match client.list_filings("00126380").await.unwrap() {
        Fetched::Value(filings) => filings,
        Fetched::Missing => panic!("expected filings"),
    };
    assert_eq!(filings.len(), 1);
    assert_eq!(filings[0].receipt_no, "20250312000123");
    assert_eq!(filings[0].receipt_year(), Some("2025"));
}

#[tokio::test]
async fn document_excerpt_strips_markup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dsaf001/main.do"))
        .and(query_param("rcpNo", "20250312000123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><p>내부회계관리제도는 효과적으로 운영되고 있습니다</p></body></html>",
        ))
        .mount(&server)
        .await;

    let client = dart_client(&server).await;
    let excerpt = match client.document_excerpt("20250312000123").await.unwrap() {
        Fetched::Value(excerpt) => excerpt,
        Fetched::Missing => panic!("expected an excerpt"),
    };
    assert!(excerpt.contains("내부회계관리제도는 효과적으로 운영되고 있습니다"));
    assert!(!excerpt.contains("<p>"));
}

#[tokio::test]
async fn document_excerpt_404_is_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dsaf001/main.do"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = dart_client(&server).await;
    let fetched = client.document_excerpt("00000000000000").await.unwrap();
    assert!(fetched.is_missing());
}

#[tokio::test]
async fn quote_uses_exchange_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/005930.KS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {
                "result": [{
                    "price": { "marketCap": { "raw": 400_000_000_000_000i64 } },
                    "defaultKeyStatistics": { "priceToBook": { "raw": 1.42 } }
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let client = YahooQuoteClient::new(&test_config())
        .unwrap()
        .with_base_url(&server.uri());
    let snapshot = match client.quote("005930", Exchange::Kospi).await.unwrap() {
        Fetched::Value(snapshot) => snapshot,
        Fetched::Missing => panic!("expected a snapshot"),
    };
    assert_eq!(snapshot.market_cap, Some(400_000_000_000_000));
    assert_eq!(snapshot.price_to_book, Some(1.42));
}

#[tokio::test]
async fn quote_for_other_exchange_is_missing_without_a_request() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would 404 the strict server.
    let client = YahooQuoteClient::new(&test_config())
        .unwrap()
        .with_base_url(&server.uri());
    let fetched = client.quote("00593K", Exchange::Other).await.unwrap();
    assert!(fetched.is_missing());
}
