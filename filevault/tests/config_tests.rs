use filevault::{FileVault, FileVaultConfig, FileVaultError};
use pretty_assertions::assert_eq;

#[test]
fn default_chunk_size() {
    assert_eq!(FileVaultConfig::default().chunk_size, 1024 * 1024);
}

#[test]
fn default_erase_settings() {
    let config = FileVaultConfig::default();
    assert_eq!(config.erase_passes, 5);
    assert_eq!(config.erase_lookback_days, 14);
    assert!(config.erase_verify);
}

#[test]
fn default_workers_and_limits() {
    let config = FileVaultConfig::default();
    assert_eq!(config.workers, 4);
    assert_eq!(config.rsa_only_max_input, 64 * 1024);
    assert_eq!(config.extension, "enc");
}

#[test]
fn default_validates() {
    FileVaultConfig::default().validate().unwrap();
}

#[test]
fn partial_toml_keeps_defaults() {
    let config = FileVaultConfig::from_toml_str(
        r#"
        chunk_size = 65536
        workers = 2
        "#,
    )
    .unwrap();
    assert_eq!(config.chunk_size, 65536);
    assert_eq!(config.workers, 2);
    assert_eq!(config.erase_passes, 5);
    assert_eq!(config.extension, "enc");
}

#[test]
fn toml_roundtrip() {
    let mut config = FileVaultConfig::default();
    config.extension = "locked".into();
    config.erase_verify = false;
    let text = toml::to_string(&config).unwrap();
    assert_eq!(FileVaultConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn load_reads_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("filevault.toml");
    std::fs::write(&path, "erase_passes = 7\n").unwrap();
    assert_eq!(FileVaultConfig::load(&path).unwrap().erase_passes, 7);
}

#[test]
fn malformed_toml_is_config_error() {
    assert!(matches!(
        FileVaultConfig::from_toml_str("chunk_size = \"big\""),
        Err(FileVaultError::Config(_))
    ));
}

#[test]
fn invalid_values_are_rejected() {
    let cases = [
        "chunk_size = 0",
        "chunk_size = 1000",
        "chunk_size = 134217728",
        "erase_passes = 0",
        "workers = 0",
        "extension = \"\"",
        "extension = \"tar.gz\"",
        "extension = \"a/b\"",
    ];
    for case in cases {
        assert!(
            matches!(FileVaultConfig::from_toml_str(case), Err(FileVaultError::Config(_))),
            "{case}"
        );
    }
}

#[test]
fn vault_rejects_invalid_config() {
    let config = FileVaultConfig {
        workers: 0,
        ..FileVaultConfig::default()
    };
    assert!(matches!(FileVault::new(&config), Err(FileVaultError::Config(_))));
}
