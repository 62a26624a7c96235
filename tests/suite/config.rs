//! Configuration file loading and wiring into the gateway

use std::fs;
use std::time::Duration;

use iadess_config::{ConfigError, IadessConfig};
use iadess_providers::{ApiKey, GatewayError, GeminiConfig, GeminiGateway};
use iadess_types::{Realm, TokenGrade};

#[test]
fn missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = IadessConfig::load_from(&dir.path().join("config.toml")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn parse_failure_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[forge\nheat_increment = ").unwrap();

    let err = IadessConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), path.as_path());
}

#[test]
fn file_sections_flow_into_runtime_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let data_dir = dir.path().join("data");
    fs::write(
        &path,
        format!(
            r#"
[app]
default_realm = "functions"
data_dir = "{}"

[api_keys]
google = "from-file"

[google]
artifact_model = "gemini-custom"
request_timeout_secs = 30
search_grounding = false

[ledger]
starting_balance = 300
grade = "OMEGA"

[forge]
heat_increment = 20
transmute_cost = 75

[retry]
max_retries = 1
initial_delay = 250
"#,
            data_dir.display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    let config = IadessConfig::load_from(&path).unwrap().unwrap();
    assert_eq!(config.default_realm().unwrap(), Realm::Functions);
    assert_eq!(
        config.artifacts_path(),
        Some(data_dir.join("iadess_artifacts.json"))
    );

    let ledger = config.ledger_params();
    assert_eq!(ledger.starting_balance, 300);
    assert_eq!(ledger.grade, TokenGrade::Omega);

    let forge = config.forge_params();
    assert_eq!(forge.heat_increment, 20);
    assert_eq!(forge.transmute_cost, 75);
    assert_eq!(forge.prepared_min, 60);
    assert!(forge.validate().is_ok());

    let key = config.resolve_api_key().unwrap();
    assert_eq!(key.expose(), "from-file");

    let gemini = config.gemini_config(key);
    assert_eq!(gemini.artifact_model, "gemini-custom");
    assert_eq!(gemini.text_model, GeminiConfig::new(ApiKey::new("k")).text_model);
    assert_eq!(gemini.request_timeout, Duration::from_secs(30));
    assert!(!gemini.search_grounding);
    assert_eq!(gemini.retry.max_retries, 1);
    assert_eq!(gemini.retry.initial_delay, Duration::from_millis(250));

    assert!(GeminiGateway::new(gemini).is_ok());
}

#[test]
fn gateway_requires_a_key() {
    let err = GeminiGateway::new(GeminiConfig::new(ApiKey::new("  "))).unwrap_err();
    assert!(matches!(err, GatewayError::MissingApiKey));
}
