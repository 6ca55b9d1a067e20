use std::io::Write;

use cadence_core::config::{CadenceConfig, UserPreferences};
use cadence_core::error::CadenceError;

#[test]
fn test_load_full_config() {
    let toml_content = r#"
preferences_path = "/tmp/cadence-prefs.toml"

[context]
event_log_capacity = 25
subscriber_buffer = 128

[impact]
high_severity_window = 2

[log]
filter = "cadence=debug"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = CadenceConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.context.event_log_capacity, 25);
    assert_eq!(config.context.subscriber_buffer, 128);
    assert_eq!(config.impact.high_severity_window, 2);
    assert_eq!(config.log.filter, "cadence=debug");
    assert_eq!(
        config.preferences_file(),
        std::path::PathBuf::from("/tmp/cadence-prefs.toml")
    );
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("CADENCE_TEST_LOG_FILTER", "cadence_agent=trace");

    let toml_content = r#"
[log]
filter = "${CADENCE_TEST_LOG_FILTER}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = CadenceConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.log.filter, "cadence_agent=trace");

    std::env::remove_var("CADENCE_TEST_LOG_FILTER");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"# nothing configured\n").expect("write toml");

    let config = CadenceConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.context.event_log_capacity, 10);
    assert_eq!(config.impact.high_severity_window, 3);
    assert!(config.preferences_path.is_none());
    assert!(config.preferences_file().ends_with(".cadence/preferences.toml"));
}

#[test]
fn test_missing_file_is_config_not_found() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let err = CadenceConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, CadenceError::ConfigNotFound(_)));
}

#[test]
fn test_invalid_config_rejected() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[context]\nevent_log_capacity = 0\n").expect("write toml");
    assert!(matches!(
        CadenceConfig::load(tmp.path()),
        Err(CadenceError::Config(_))
    ));

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[context\n").expect("write toml");
    assert!(matches!(
        CadenceConfig::load(tmp.path()),
        Err(CadenceError::Config(_))
    ));
}

#[test]
fn test_preferences_file_round_trip() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("preferences.toml");

    let toml_content = r#"
preferred_workflow = "content-approval"

[brand_context]
brand_name = "Cardiomax"
therapeutic_area = "Cardiology"
"#;
    std::fs::write(&path, toml_content).expect("write prefs");

    let prefs = UserPreferences::load_or_default(&path).expect("load prefs");
    assert_eq!(prefs.preferred_workflow.as_deref(), Some("content-approval"));
    assert_eq!(prefs.brand_context.len(), 2);
    assert!(prefs.show_reasoning);
}
