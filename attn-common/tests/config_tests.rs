//! Integration tests for configuration loading and root folder resolution
//!
//! Tests that manipulate ATTN_ROOT_FOLDER are marked #[serial] so they do not
//! race each other on the process environment.

use attn_common::config::{
    load_toml_config, CompiledDefaults, RootFolderInitializer, RootFolderResolver, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(None, None);
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_cli_beats_env_and_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/attn-from-env");

    let resolver = RootFolderResolver::new(
        Some(PathBuf::from("/tmp/attn-from-cli")),
        Some(PathBuf::from("/tmp/attn-from-toml")),
    );
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/attn-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/attn-from-env");

    let resolver = RootFolderResolver::new(None, Some(PathBuf::from("/tmp/attn-from-toml")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/attn-from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_falls_back_to_toml() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(None, Some(PathBuf::from("/tmp/attn-from-toml")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/attn-from-toml"));
}

#[test]
fn test_missing_toml_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();

    assert!(config.sheet_name.is_none());
    assert!(config.root_folder.is_none());
}

#[test]
fn test_toml_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("attn-svc.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/attendance"
sheet_name = "Spring"
time_zone = "Asia/Kolkata"
port = 8088
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/attendance")));
    assert_eq!(config.sheet_name.as_deref(), Some("Spring"));
    assert_eq!(config.time_zone.as_deref(), Some("Asia/Kolkata"));
    assert_eq!(config.port, Some(8088));
}

#[test]
fn test_malformed_toml_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("attn-svc.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    assert!(load_toml_config(&path).is_err());
}

#[test]
fn test_initializer_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("nested").join("root");

    let initializer = RootFolderInitializer::new(root.clone());
    assert!(!initializer.database_exists());

    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("attendance.db"));
    assert_eq!(
        initializer.photo_folder("Attendance_Selfies").unwrap(),
        root.join("Attendance_Selfies")
    );
}
