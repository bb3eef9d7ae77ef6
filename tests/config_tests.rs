use loraraw_rs::config::{CodecConfig, ConfigError};
use loraraw_rs::loraraw::crypto::open;
use loraraw_rs::DropletModel;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"{
            "aes_key": "000102030405060708090A0B0C0D0E0F",
            "default_opts": 5,
            "initial_nonce": 250,
            "legacy_model": "THLM"
        }"#,
    );
    let config = CodecConfig::load(file.path()).unwrap();
    assert_eq!(config.default_opts, 5);
    assert_eq!(config.legacy_model, Some(DropletModel::Thlm));

    let key = config.key().unwrap();
    let session = config.session();
    let envelope = session
        .encrypt("01020304", &[0x00], key.as_bytes(), config.default_opts)
        .unwrap();
    let opened = open(&envelope, key.as_bytes()).unwrap();
    assert_eq!(opened.nonce, 250);
    assert_eq!(opened.opts, 5);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = CodecConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_malformed_json() {
    let file = write_config("{ not json");
    assert!(matches!(
        CodecConfig::load(file.path()),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn test_invalid_key_reported_at_load() {
    let file = write_config(r#"{"aes_key": "not-a-key"}"#);
    let err = CodecConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("Invalid aes_key"));
}
