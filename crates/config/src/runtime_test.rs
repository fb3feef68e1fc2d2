//! Tests for runtime snapshots and updates

use std::time::Duration;

use super::*;

#[test]
fn test_default_snapshot_matches_config_defaults() {
    let runtime = RuntimeConfig::default();
    assert_eq!(runtime.address, "0.0.0.0");
    assert_eq!(runtime.port, 7070);
    assert_eq!(runtime.bind_address(), "0.0.0.0:7070");
    assert_eq!(runtime.verbosity, LogLevel::Info);
    assert_eq!(runtime.transform_timeout, Duration::from_secs(5));
    assert_eq!(runtime.partitions, 4);
    assert!(runtime.auto_consolidate);
}

#[test]
fn test_with_setting_each_key() {
    let base = RuntimeConfig::default();
    let set = |key, value| base.with_setting(key, value).unwrap();

    assert_eq!(set("address", "127.0.0.1").address, "127.0.0.1");
    assert_eq!(set("port", "9000").port, 9000);
    assert_eq!(set("verbosity", "debug").verbosity, LogLevel::Debug);
    assert_eq!(
        set("transform_timeout", "250ms").transform_timeout,
        Duration::from_millis(250)
    );
    assert_eq!(
        set("enqueue_timeout", "2s").enqueue_timeout,
        Duration::from_secs(2)
    );
    assert!(!set("auto_consolidate", "off").auto_consolidate);
    assert!(set("print_topology", "true").print_topology);
}

#[test]
fn test_with_setting_rejects_bad_values() {
    let base = RuntimeConfig::default();

    assert!(matches!(
        base.with_setting("port", "70000"),
        Err(ConfigError::InvalidValue { field: "port", .. })
    ));
    assert!(base.with_setting("port", "0").is_err());
    assert!(base.with_setting("verbosity", "shouty").is_err());
    assert!(base.with_setting("transform_timeout", "soon").is_err());
    assert!(base.with_setting("transform_timeout", "0s").is_err());
    assert!(base.with_setting("address", "  ").is_err());
    assert!(base.with_setting("auto_consolidate", "maybe").is_err());
}

#[test]
fn test_with_setting_rejects_structural_keys() {
    let base = RuntimeConfig::default();
    for key in ["partitions", "queue_size", "workers", "tokens"] {
        assert!(matches!(
            base.with_setting(key, "1"),
            Err(ConfigError::UnknownSetting(_))
        ));
    }
}

#[test]
fn test_every_listed_setting_is_accepted() {
    let base = RuntimeConfig::default();
    let samples = [
        ("address", "10.0.0.1"),
        ("port", "8080"),
        ("verbosity", "warn"),
        ("transform_timeout", "1s"),
        ("enqueue_timeout", "1s"),
        ("auto_consolidate", "false"),
        ("print_topology", "true"),
    ];
    for key in RUNTIME_SETTINGS {
        let (_, value) = samples.iter().find(|(k, _)| k == key).unwrap();
        assert!(base.with_setting(key, value).is_ok(), "{key} rejected");
    }
}

// ============================================================================
// RuntimeHandle
// ============================================================================

#[test]
fn test_handle_update_installs_new_snapshot() {
    let handle = RuntimeHandle::default();
    let before = handle.load();

    let after = handle.apply_update("transform_timeout", "1s").unwrap();

    assert_eq!(after.transform_timeout, Duration::from_secs(1));
    assert_eq!(handle.load().transform_timeout, Duration::from_secs(1));
    // Old snapshot is untouched
    assert_eq!(before.transform_timeout, Duration::from_secs(5));
}

#[test]
fn test_handle_rejected_update_changes_nothing() {
    let handle = RuntimeHandle::default();
    let before = handle.load();

    assert!(handle.apply_update("verbosity", "nope").is_err());
    assert!(handle.apply_update("bogus", "1").is_err());

    assert!(Arc::ptr_eq(&before, &handle.load()));
}

#[test]
fn test_startup_settings_are_recorded_without_rebinding() {
    assert_eq!(STARTUP_SETTINGS, ["address", "port"]);
    assert!(STARTUP_SETTINGS.iter().all(|key| RUNTIME_SETTINGS.contains(key)));

    let handle = RuntimeHandle::default();
    let after = handle.apply_update("address", "10.0.0.1").unwrap();
    assert_eq!(after.bind_address(), "10.0.0.1:7070");
    assert_eq!(handle.load().address, "10.0.0.1");
}

#[test]
fn test_handle_clones_share_state() {
    let handle = RuntimeHandle::default();
    let other = handle.clone();

    handle.apply_update("port", "9999").unwrap();
    assert_eq!(other.load().port, 9999);
}

#[tokio::test]
async fn test_subscribe_sees_updates() {
    let handle = RuntimeHandle::default();
    let mut changes = handle.subscribe();

    handle.apply_update("verbosity", "trace").unwrap();

    changes.changed().await.unwrap();
    assert_eq!(changes.borrow().verbosity, LogLevel::Trace);
}
