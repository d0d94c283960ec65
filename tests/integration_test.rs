//! Integration tests for Stockfind using on-disk symbol files

use std::sync::Arc;
use std::time::Duration;

use stockfind::config::load_config;
use stockfind::{DirectorySource, JsonFileSource, SearchPipeline};
use tempfile::TempDir;

const SYMBOLS: &str = r#"[
    {"symbol": "AAPL", "description": "APPLE INC", "type": "Common Stock"},
    {"symbol": "MSFT", "description": "MICROSOFT CORP", "type": "Common Stock"},
    {"symbol": "GOOGL", "description": "ALPHABET INC-CL A", "type": "Common Stock"},
    {"symbol": "AMZN", "description": "AMAZON.COM INC", "type": "Common Stock"},
    {"symbol": "", "description": "EMPTY SYMBOL"},
    {"symbol": "TSLA"}
]"#;

#[tokio::test]
async fn test_full_workflow() {
    // Write a saved provider response and a config that points at it
    let temp_dir = TempDir::new().unwrap();
    let symbols_path = temp_dir.path().join("symbols.json");
    std::fs::write(&symbols_path, SYMBOLS).unwrap();

    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        "[search]\ndebounce_ms = 10\nresult_limit = 5\n\n[provider]\nexchange = \"US\"\n",
    )
    .unwrap();

    let config = load_config(Some(&config_path)).unwrap();
    assert_eq!(config.search.debounce_ms, 10);
    assert_eq!(config.search.min_query_len, 2);

    let source = Arc::new(JsonFileSource::new(&symbols_path));
    let pipeline = SearchPipeline::spawn(config.search, source);

    let loaded = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.wait_for(|v| v.fetched_at.is_some()),
    )
    .await
    .expect("directory never loaded")
    .unwrap();

    // Empty symbol skipped, missing description kept with an empty name
    assert_eq!(loaded.directory_len, 5);
    assert!(loaded.error.is_none());

    pipeline.set_query("microsft");
    let view = tokio::time::timeout(Duration::from_secs(5), pipeline.wait_for(|v| v.searches_run > 0))
        .await
        .expect("query never settled")
        .unwrap();

    assert_eq!(view.debounced_query, "microsft");
    assert_eq!(view.results[0].symbol, "MSFT");
    assert_eq!(view.results[0].name, "MICROSOFT CORP");

    pipeline.shutdown();
    pipeline.closed().await;
    assert!(!pipeline.is_running());
}

#[tokio::test]
async fn test_missing_file_reports_error() {
    let temp_dir = TempDir::new().unwrap();
    let source = Arc::new(JsonFileSource::new(temp_dir.path().join("missing.json")));
    let pipeline = SearchPipeline::spawn(Default::default(), source);

    let view = tokio::time::timeout(Duration::from_secs(5), pipeline.wait_for(|v| v.error.is_some()))
        .await
        .expect("failure never surfaced")
        .unwrap();

    let error = view.error.unwrap();
    assert!(error.starts_with("Error fetching symbols:"), "error was {}", error);
    assert!(error.contains("missing.json"));
    assert!(!view.loading);
    assert_eq!(view.directory_len, 0);
}

#[tokio::test]
async fn test_file_source_rejects_object_body() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("symbols.json");
    std::fs::write(&path, r#"{"symbols": []}"#).unwrap();

    let err = JsonFileSource::new(&path).fetch().await.unwrap_err();
    assert!(format!("{:#}", err).contains("JSON array"));
}

#[test]
fn test_explicit_config_must_exist() {
    let temp_dir = TempDir::new().unwrap();
    let err = load_config(Some(&temp_dir.path().join("nope.toml"))).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config file"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[search]\nthreshold = 1.5\n").unwrap();

    let err = load_config(Some(&path)).unwrap_err();
    assert!(format!("{:#}", err).contains("threshold"));
}
