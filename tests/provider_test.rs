//! HTTP provider tests against a local mock server

use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;

use stockfind::{DirectorySource, FinnhubSource, ProviderConfig, SearchConfig, SearchPipeline};

const SYMBOL_PATH: &str = "/api/v1/stock/symbol";

const BODY: &str = r#"[
    {"currency": "USD", "description": "APPLE INC", "displaySymbol": "AAPL", "figi": "BBG000B9XRY4", "mic": "XNAS", "symbol": "AAPL", "type": "Common Stock"},
    {"currency": "USD", "description": "MICROSOFT CORP", "displaySymbol": "MSFT", "figi": "BBG000BPH459", "mic": "XNAS", "symbol": "MSFT", "type": "Common Stock"},
    {"description": "MISSING SYMBOL"}
]"#;

fn source(server: &mockito::Server, token: &str) -> FinnhubSource {
    FinnhubSource::new(
        format!("{}{}", server.url(), SYMBOL_PATH),
        "US",
        token,
        Some(Duration::from_secs(5)),
    )
    .unwrap()
}

fn query_matcher(token: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("exchange".into(), "US".into()),
        Matcher::UrlEncoded("token".into(), token.into()),
    ])
}

#[tokio::test]
async fn test_fetch_sends_exchange_and_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", SYMBOL_PATH)
        .match_query(query_matcher("test-token"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(BODY)
        .create_async()
        .await;

    let records = source(&server, "test-token").fetch().await.unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].symbol, "AAPL");
    assert_eq!(records[0].description, "APPLE INC");
    assert_eq!(records[1].display_symbol.as_deref(), Some("MSFT"));
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", SYMBOL_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let err = source(&server, "test-token").fetch().await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("500"), "message was {}", message);
    assert!(message.contains("upstream unavailable"));
}

#[tokio::test]
async fn test_non_array_body_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", SYMBOL_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"error": "You don't have access to this resource."}"#)
        .create_async()
        .await;

    let err = source(&server, "test-token").fetch().await.unwrap_err();
    assert!(format!("{:#}", err).contains("JSON array"));
}

#[tokio::test]
async fn test_invalid_json_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", SYMBOL_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let err = source(&server, "test-token").fetch().await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse"));
}

#[tokio::test]
async fn test_connection_error_does_not_leak_token() {
    // Port 1 is reserved and refuses connections
    let source = FinnhubSource::new(
        format!("http://127.0.0.1:1{}", SYMBOL_PATH),
        "US",
        "super-secret-token",
        Some(Duration::from_secs(5)),
    )
    .unwrap();

    let err = source.fetch().await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to send request"));
    assert!(!message.contains("super-secret-token"), "message was {}", message);
}

#[tokio::test]
async fn test_from_config_uses_configured_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", SYMBOL_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("exchange".into(), "TO".into()),
            Matcher::UrlEncoded("token".into(), "cfg-token".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let config = ProviderConfig {
        endpoint: format!("{}{}", server.url(), SYMBOL_PATH),
        exchange: "TO".to_string(),
        token: Some("cfg-token".to_string()),
        request_timeout_secs: 5,
    };

    let records = FinnhubSource::from_config(&config).unwrap().fetch().await.unwrap();
    mock.assert_async().await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_pipeline_surfaces_http_500() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", SYMBOL_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let pipeline = SearchPipeline::spawn(SearchConfig::default(), Arc::new(source(&server, "t")));

    let view = tokio::time::timeout(Duration::from_secs(10), pipeline.wait_for(|v| v.error.is_some()))
        .await
        .expect("pipeline never reported the failure")
        .unwrap();

    let error = view.error.unwrap();
    assert!(!error.is_empty());
    assert!(error.contains("500"), "error was {}", error);
    assert!(!view.loading);
    assert_eq!(view.directory_len, 0);
    assert!(view.fetched_at.is_none());
}

#[tokio::test]
async fn test_pipeline_end_to_end_search() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", SYMBOL_PATH)
        .match_query(query_matcher("t"))
        .with_status(200)
        .with_body(BODY)
        .create_async()
        .await;

    let config = SearchConfig {
        debounce_ms: 20,
        ..Default::default()
    };
    let pipeline = SearchPipeline::spawn(config, Arc::new(source(&server, "t")));

    tokio::time::timeout(Duration::from_secs(10), pipeline.wait_for(|v| v.directory_len == 2))
        .await
        .expect("directory never loaded")
        .unwrap();

    pipeline.set_query("APL");
    let view = tokio::time::timeout(Duration::from_secs(10), pipeline.wait_for(|v| v.searches_run > 0))
        .await
        .expect("query never settled")
        .unwrap();

    assert_eq!(view.results.len(), 1);
    assert_eq!(view.results[0].symbol, "AAPL");
    assert_eq!(view.results[0].name, "APPLE INC");

    pipeline.shutdown();
}
