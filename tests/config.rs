//! Configuration tests.

mod common;

use common::{create_config_file, create_minimal_config, load_config};
use remote_collections::core::config::{ClientConfig, ConfigOverrides};
use remote_collections::core::telemetry::init_tracing;
use remote_collections::serializer::SerializerKind;
use remote_collections::{CollectionFactory, HashStore, MemoryHashStore};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn parse_minimal_config() {
    let file = create_minimal_config();
    let config = load_config(&file);

    assert_eq!(config.redis.address, "127.0.0.1:6379");
    assert_eq!(config.redis.database, None);
    assert_eq!(config.redis.connect_timeout(), Duration::from_secs(5));
    assert_eq!(config.redis.io_timeout(), Duration::from_secs(5));
    assert_eq!(config.collections.scan_batch_size, 250);
    assert_eq!(config.collections.key_serializer, SerializerKind::Json);
    assert_eq!(config.telemetry.log_level, "info");
}

#[test]
fn parse_full_config() {
    let file = create_config_file(
        r#"
[redis]
address = "cache.internal:6380"
database = 3
username = "app"
password = "secret"
connect_timeout_ms = 250
io_timeout_ms = 750

[collections]
scan_batch_size = 1000
key_serializer = "json"
value_serializer = "postcard"

[telemetry]
log_level = "debug"
"#,
    );
    let config = load_config(&file);

    assert_eq!(config.redis.database, Some(3));
    assert_eq!(config.redis.username.as_deref(), Some("app"));
    assert_eq!(config.redis.connect_timeout(), Duration::from_millis(250));
    assert_eq!(config.redis.io_timeout(), Duration::from_millis(750));
    assert_eq!(config.collections.scan_batch_size, 1000);
    assert_eq!(config.collections.value_serializer, SerializerKind::Postcard);
    assert_eq!(config.telemetry.log_level, "debug");
}

#[test]
fn missing_address_is_rejected() {
    let file = create_config_file("[collections]\nscan_batch_size = 10\n");
    assert!(ClientConfig::from_file(file.path()).is_err());
}

#[test]
fn validate_rejects_bad_values() {
    let cases = [
        ("[redis]\naddress = \"\"\n", "address"),
        ("[redis]\naddress = \"h:1\"\nio_timeout_ms = 0\n", "io_timeout_ms"),
        ("[redis]\naddress = \"h:1\"\nusername = \"u\"\n", "password"),
        (
            "[redis]\naddress = \"h:1\"\n[collections]\nscan_batch_size = 0\n",
            "scan_batch_size",
        ),
        (
            "[redis]\naddress = \"h:1\"\n[telemetry]\nlog_level = \"loud\"\n",
            "log_level",
        ),
    ];

    for (content, field) in cases {
        let err = ClientConfig::from_toml(content).unwrap_err();
        assert!(
            err.to_string().contains(field),
            "expected {} in error, got: {}",
            field,
            err
        );
    }
}

#[test]
fn unknown_serializer_is_rejected() {
    let result = ClientConfig::from_toml(
        "[redis]\naddress = \"h:1\"\n[collections]\nkey_serializer = \"xml\"\n",
    );
    assert!(result.is_err());
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = ClientConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn overrides_apply_on_top() {
    let mut config = ClientConfig::for_address("127.0.0.1:6379");
    config.apply_overrides(&ConfigOverrides {
        address: Some("10.0.0.2:6379".to_string()),
        database: Some(1),
        log_level: Some("trace".to_string()),
        scan_batch_size: Some(50),
    });

    assert_eq!(config.redis.address, "10.0.0.2:6379");
    assert_eq!(config.redis.database, Some(1));
    assert_eq!(config.telemetry.log_level, "trace");
    assert_eq!(config.collections.scan_batch_size, 50);
    config.validate().unwrap();

    config.apply_overrides(&ConfigOverrides {
        scan_batch_size: Some(0),
        ..Default::default()
    });
    assert!(config.validate().is_err());
}

#[test]
fn factory_from_config_uses_serializers() {
    let config = ClientConfig::from_toml(
        "[redis]\naddress = \"h:1\"\n[collections]\nvalue_serializer = \"postcard\"\nscan_batch_size = 2\n",
    )
    .unwrap();
    let store = Arc::new(MemoryHashStore::new());
    let factory = CollectionFactory::from_config(Arc::clone(&store), &config.collections);
    assert_eq!(factory.options().scan_batch_size, 2);

    let d = factory.create_dict::<String, Vec<u16>>("cfg");
    d.set(&"k".to_string(), &vec![1, 2, 3]).unwrap();
    assert_eq!(d.get(&"k".to_string()).unwrap(), vec![1, 2, 3]);
    assert_eq!(d.iter().count(), 1);

    let raw = store.hget("IDictionary+cfg", b"\"k\"").unwrap();
    assert_eq!(raw.as_deref(), Some(&[3u8, 1, 2, 3][..]));
}

#[test]
fn tracing_initialises_once() {
    let config = ClientConfig::for_address("127.0.0.1:6379");
    let first = init_tracing(&config.telemetry);
    let second = init_tracing(&config.telemetry);
    assert!(!second);
    if cfg!(feature = "telemetry") {
        assert!(first);
    }
}
