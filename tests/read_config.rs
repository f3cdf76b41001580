use sluice::{ConfigError, ReadConfig, DEFAULT_PROGRESS_REFRESH_PERIOD_MS};
use std::time::Duration;

#[test]
fn default_refresh_period_is_one_second() {
    let config = ReadConfig::default();
    assert_eq!(
        config.refresh_period(),
        Duration::from_millis(DEFAULT_PROGRESS_REFRESH_PERIOD_MS)
    );
    assert!(!config.refresh_every_record());
}

#[test]
fn explicit_period_is_taken_verbatim() {
    let config = ReadConfig::from_millis(250).unwrap();
    assert_eq!(config.refresh_period(), Duration::from_millis(250));
}

#[test]
fn zero_means_refresh_every_record() {
    let config = ReadConfig::from_millis(0).unwrap();
    assert!(config.refresh_every_record());
}

#[test]
fn negative_period_is_rejected_not_clamped() {
    let err = ReadConfig::from_millis(-5).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::NegativeRefreshPeriod { millis: -5 }
    ));
}

#[test]
fn options_document_sets_the_period() {
    let config = ReadConfig::from_json_str(r#"{"progress_refresh_period_ms": 500}"#).unwrap();
    assert_eq!(config.refresh_period(), Duration::from_millis(500));
}

#[test]
fn options_document_without_the_key_keeps_the_default() {
    let config = ReadConfig::from_json_str("{}").unwrap();
    assert_eq!(config, ReadConfig::default());
}

#[test]
fn options_document_with_negative_period_is_rejected() {
    let err = ReadConfig::from_json_str(r#"{"progress_refresh_period_ms": -1}"#).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::NegativeRefreshPeriod { millis: -1 }
    ));
}

#[test]
fn malformed_options_document_is_a_parse_error() {
    let err = ReadConfig::from_json_str("not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
