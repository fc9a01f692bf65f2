use super::settings::{PartialBrokerSettings, PartialSettings, Settings};
use super::{load_config, load_config_from};
use crate::utils::error::BrokerError;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8765);
    assert_eq!(settings.server.addr(), "127.0.0.1:8765");
    assert_eq!(settings.broker.max_connections, 1000);
    assert_eq!(settings.broker.outbound_queue_capacity, 256);
    assert!(!settings.broker.prune_empty_channels);
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn partial_settings_keep_unspecified_defaults() {
    let partial = PartialSettings {
        broker: Some(PartialBrokerSettings {
            prune_empty_channels: Some(true),
            outbound_queue_capacity: Some(0),
            ..Default::default()
        }),
        ..Default::default()
    };

    let merged = partial.merge_onto(Settings::default());
    assert!(merged.broker.prune_empty_channels);
    assert_eq!(merged.broker.outbound_queue_capacity, 2);
    assert_eq!(merged.broker.max_connections, 1000);
    assert_eq!(merged.server, Settings::default().server);
}

#[test]
#[serial]
fn load_config_from_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let stem = tmp.path().join("absent");

    let cfg = load_config_from(stem.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        max_connections = 10
        prune_empty_channels = true
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config();

    // restore cwd before asserting so a failure cannot leak the tempdir cwd
    env::set_current_dir(orig).expect("restore cwd");

    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.broker.max_connections, 10);
    assert!(cfg.broker.prune_empty_channels);
    assert_eq!(cfg.broker.outbound_queue_capacity, 256);
}

#[test]
#[serial]
fn environment_overrides_file_and_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        outbound_queue_capacity = 64
    "#;
    fs::write(tmp.path().join("chanbus.toml"), toml).expect("write config file");
    let stem = tmp.path().join("chanbus");

    temp_env::with_vars(
        [
            ("CHANBUS_SERVER__PORT", Some("9100")),
            ("CHANBUS_BROKER__OUTBOUND_QUEUE_CAPACITY", Some("8")),
            ("CHANBUS_LOGGING__LEVEL", Some("debug")),
        ],
        || {
            let cfg = load_config_from(stem.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.server.host, "0.0.0.0");
            assert_eq!(cfg.broker.outbound_queue_capacity, 8);
            assert_eq!(cfg.broker.max_connections, 1000);
            assert_eq!(cfg.logging.level, "debug");
        },
    );
}

#[test]
#[serial]
fn malformed_file_is_a_config_error() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        port = "not a port"
    "#;
    fs::write(tmp.path().join("broken.toml"), toml).expect("write config file");
    let stem = tmp.path().join("broken");

    let err = load_config_from(stem.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, BrokerError::Config(_)), "got {err:?}");
}
