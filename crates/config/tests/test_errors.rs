//! Tests for error handling

use parley_config::{ConfigError, ProviderKind};
use std::io;
use std::path::PathBuf;

#[test]
fn test_io_error_display() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err = ConfigError::Io(io_err);

    let display = format!("{}", err);
    assert!(display.contains("DATA LINK ERROR"));
    assert!(display.contains("file not found"));
}

#[test]
fn test_json_error_display() {
    let json_err: serde_json::Error =
        serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
    let err: ConfigError = json_err.into();

    assert!(matches!(err, ConfigError::Json(_)));
    assert!(err.to_string().contains("MALFORMED CONFIG"));
}

#[test]
fn test_not_found_error_display() {
    let err = ConfigError::NotFound(PathBuf::from("/some/path"));

    let display = format!("{}", err);
    assert!(display.contains("CONFIG NOT FOUND"));
    assert!(display.contains("/some/path"));
}

#[test]
fn test_missing_api_key_display_names_variable() {
    let err = ConfigError::MissingApiKey {
        provider: ProviderKind::OpenRouter,
        variable: "OPENROUTER_API_KEY".to_string(),
    };

    let display = err.to_string();
    assert!(display.contains("openrouter"));
    assert!(display.contains("OPENROUTER_API_KEY"));
}

#[test]
fn test_error_trait() {
    fn check_error_trait<T: std::error::Error + Send + Sync + 'static>() {}
    check_error_trait::<ConfigError>();
}
