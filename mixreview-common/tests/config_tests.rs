//! Configuration resolution tests
//!
//! Tests that manipulate MIXREVIEW_* environment variables are marked #[serial]
//! so they never run in parallel with each other.

use mixreview_common::config::{
    resolve_secret_key, CompiledDefaults, RootFolderInitializer, RootFolderResolver,
    SecretSource, TomlConfig, DEV_SECRET_KEY, ROOT_FOLDER_ENV, SECRET_KEY_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(None, TomlConfig::default());
    let root_folder = resolver.resolve();

    assert!(!root_folder.as_os_str().is_empty());
    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_priority_order() {
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/mixreview-from-toml")),
        ..Default::default()
    };

    env::remove_var(ROOT_FOLDER_ENV);
    let resolver = RootFolderResolver::new(None, toml.clone());
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/mixreview-from-toml"));

    env::set_var(ROOT_FOLDER_ENV, "/tmp/mixreview-from-env");
    let resolver = RootFolderResolver::new(None, toml.clone());
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/mixreview-from-env"));

    let resolver = RootFolderResolver::new(Some(PathBuf::from("/tmp/mixreview-from-cli")), toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/mixreview-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_toml_parse_all_fields() {
    let config = TomlConfig::parse(
        r#"
        root_folder = "/srv/mixreview"
        host = "0.0.0.0"
        port = 9000
        max_upload_mb = 100
        secret_key = "s3cret"
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/mixreview")));
    assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.port, Some(9000));
    assert_eq!(config.max_upload_mb, Some(100));
    assert_eq!(config.secret_key.as_deref(), Some("s3cret"));
}

#[test]
fn test_toml_parse_rejects_malformed() {
    assert!(TomlConfig::parse("port = \"not a number\"").is_err());
}

#[test]
fn test_toml_load_missing_file_is_empty() {
    let config = TomlConfig::load(Some(&PathBuf::from("/nonexistent/mixreview/config.toml")));
    assert!(config.root_folder.is_none());
    assert!(config.port.is_none());
}

#[test]
fn test_toml_load_malformed_file_is_empty() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let config = TomlConfig::load(Some(&path));
    assert!(config.secret_key.is_none());
}

#[test]
#[serial]
fn test_secret_key_resolution() {
    env::remove_var(SECRET_KEY_ENV);

    let (secret, source) = resolve_secret_key(&TomlConfig::default());
    assert_eq!(secret, DEV_SECRET_KEY);
    assert_eq!(source, SecretSource::DevelopmentDefault);

    let toml = TomlConfig {
        secret_key: Some("from-file".to_string()),
        ..Default::default()
    };
    let (secret, source) = resolve_secret_key(&toml);
    assert_eq!(secret, "from-file");
    assert_eq!(source, SecretSource::ConfigFile);

    env::set_var(SECRET_KEY_ENV, "from-env");
    let (secret, source) = resolve_secret_key(&toml);
    assert_eq!(secret, "from-env");
    assert_eq!(source, SecretSource::Environment);

    env::remove_var(SECRET_KEY_ENV);
}

#[test]
fn test_initializer_creates_layout() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("nested").join("root");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.uploads_dir().is_dir());
    assert_eq!(initializer.database_path(), root.join("mixreview.db"));
}
