//! Behaviour tests for configuration loading and event keyword matching.

use std::collections::HashMap;
use std::io::Write;

use twmon_core::config::{ConfigError, ENV_FINMIND_TOKEN, ENV_REQUEST_DELAY_MS};
use twmon_core::{EventBook, EventRule, MonitorConfig, StockId};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn ids(raw: &[&str]) -> Vec<StockId> {
    raw.iter()
        .map(|id| StockId::parse(id).expect("valid id"))
        .collect()
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn when_config_file_is_partial_missing_fields_take_defaults() {
    // Given: A file that only overrides the request delay
    let file = write_config(r#"{"request_delay_ms": 250}"#);

    // When
    let config = MonitorConfig::from_file(file.path()).expect("config loads");

    // Then
    assert_eq!(config.request_delay_ms, 250);
    assert_eq!(config.history_days, MonitorConfig::default().history_days);
    assert_eq!(config.indicators, MonitorConfig::default().indicators);
    assert!(config.validate().is_ok());
}

#[test]
fn when_indicator_windows_are_overridden_they_are_used_verbatim() {
    let file = write_config(
        r#"{"history_days": 120, "indicators": {"close_windows": [5, 60], "suggested_windows": [20, 60]}}"#,
    );

    let config = MonitorConfig::from_file(file.path()).expect("config loads");

    assert_eq!(config.indicators.close_windows, vec![5, 60]);
    assert_eq!(config.indicators.volume_windows, vec![2, 5, 10, 20]);
    assert_eq!(config.indicators.suggested_windows, (20, 60));
    assert!(config.validate().is_ok());
}

#[test]
fn when_a_window_is_zero_validation_fails() {
    let file = write_config(r#"{"indicators": {"volume_windows": [0, 5]}}"#);
    let config = MonitorConfig::from_file(file.path()).expect("config parses");

    let err = config.validate().expect_err("must fail");

    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("greater than zero"));
}

#[test]
fn when_history_is_shorter_than_longest_window_validation_fails() {
    let config = MonitorConfig {
        history_days: 10,
        ..MonitorConfig::default()
    };

    let err = config.validate().expect_err("must fail");

    assert!(err.to_string().contains("history_days"));
}

#[test]
fn when_config_file_is_malformed_error_names_the_path() {
    let file = write_config("{ not json");

    let err = MonitorConfig::from_file(file.path()).expect_err("must fail");

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn environment_overrides_file_values_and_rejects_garbage() {
    // Given
    let env = HashMap::from([
        (ENV_REQUEST_DELAY_MS, String::from("0")),
        (ENV_FINMIND_TOKEN, String::from("token-123")),
    ]);
    let mut config = MonitorConfig::default();

    // When
    config
        .apply_env(|name| env.get(name).cloned())
        .expect("overrides apply");

    // Then
    assert_eq!(config.request_delay_ms, 0);
    assert_eq!(config.finmind_token.as_deref(), Some("token-123"));

    // And: Non-numeric values are rejected
    let bad = HashMap::from([(ENV_REQUEST_DELAY_MS, String::from("soon"))]);
    let err = config
        .apply_env(|name| bad.get(name).cloned())
        .expect_err("must fail");
    assert!(matches!(err, ConfigError::InvalidEnv { .. }));
}

#[test]
fn token_is_never_serialized() {
    let config = MonitorConfig {
        finmind_token: Some(String::from("secret")),
        ..MonitorConfig::default()
    };

    let json = serde_json::to_string(&config).expect("serializes");

    assert!(!json.contains("secret"));
}

// =============================================================================
// Event keyword matching
// =============================================================================

#[test]
fn when_headline_mentions_two_events_tickers_are_merged_without_duplicates() {
    // Given: "AI" maps to 2330 first, "蘋果" maps to 2317 and 2330
    let book = EventBook::builtin();

    // When
    let tickers = book.tickers_for("輝達財報亮眼，蘋果新機備貨");

    // Then: First occurrence order is kept and 2330 appears once
    assert_eq!(tickers, ids(&["2330", "2382", "3231", "2357", "2317"]));
}

#[test]
fn aliases_match_case_insensitively() {
    let book = EventBook::builtin();

    let matched = book
        .match_text("Shipping rates jump as RED SEA diversions continue")
        .into_iter()
        .map(|rule| rule.keyword.as_str())
        .collect::<Vec<_>>();

    assert_eq!(matched, vec!["紅海"]);
}

#[test]
fn when_english_headline_only_contains_ai_inside_words_nothing_matches() {
    // Given: "Taiwan" and "said" both contain the letters of the AI keyword
    let book = EventBook::builtin();

    // When
    let tickers = book.tickers_for("Taiwan exports rise as shipping rates said to ease");

    // Then
    assert!(tickers.is_empty(), "unexpected tickers: {tickers:?}");
}

#[test]
fn unrelated_text_matches_nothing() {
    let book = EventBook::builtin();

    assert!(book.match_text("央行維持利率不變").is_empty());
    assert!(book.tickers_for("").is_empty());
}

#[test]
fn custom_rule_book_is_matched_in_table_order() {
    // Given
    let book = EventBook::new(vec![
        EventRule::new("航運", &["shipping"], ids(&["2603"]), "freight"),
        EventRule::new("貨櫃", &[], ids(&["2609", "2603"]), "containers"),
    ]);

    // When
    let tickers = book.tickers_for("貨櫃航運 shipping");

    // Then
    assert_eq!(tickers, ids(&["2603", "2609"]));
    assert_eq!(book.rules().len(), 2);
}
