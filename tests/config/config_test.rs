//! Tests for `src/config.rs`.

use owlcore::config::{load_config, DirectionRestriction, PolicyMode};

#[test]
fn load_full_logging_table() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[logging]
logging = true
class_logging = true
log_logins = true
direction = "in"
log_filter = "sender ^alice$"
log_path = "/var/zlog/people"
class_log_path = "~/zlog/class"
local_realm = "ATHENA.MIT.EDU"
policy = "host"
time_format = "%Y-%m-%d"

[display]
ignored = "other tables are shared with the client"
"#,
    )
    .expect("write config");

    let config = load_config(&path).expect("config should load");
    let logging = config.logging;
    assert!(logging.logging && logging.class_logging && logging.log_logins);
    assert_eq!(logging.direction, DirectionRestriction::In);
    assert_eq!(logging.policy, PolicyMode::Host);
    assert_eq!(logging.log_dir(), std::path::PathBuf::from("/var/zlog/people"));
    assert!(logging.class_log_dir().ends_with("zlog/class"));
    assert_eq!(logging.time_format, "%Y-%m-%d");
}

#[test]
fn empty_file_uses_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "").expect("write config");

    let config = load_config(&path).expect("config should load");
    assert!(!config.logging.logging);
    assert_eq!(config.logging.policy, PolicyMode::Native);
    assert!(config.logging.log_filter.is_none());
}

#[test]
fn missing_file_is_an_error() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let err = load_config(&tmp.path().join("absent.toml")).expect_err("should fail");
    assert!(err.to_string().contains("failed to read config"));
}

#[test]
fn bad_enum_value_is_an_error() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[logging]\ndirection = \"sideways\"\n").expect("write config");
    let err = load_config(&path).expect_err("should fail");
    assert!(err.to_string().contains("failed to parse config"));
}
