// tests/config_test.rs
use std::env;
use std::fs;
use std::path::Path;

use lionp::config::{find_config, load_config, read_config_file, PartialConfig};
use lionp::LionpError;
use serial_test::serial;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_np_config_json() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".np-config.json", r#"{"branch": "release", "2fa": false}"#);

    let (path, config) = find_config(dir.path(), None).unwrap().unwrap();
    assert_eq!(path, dir.path().join(".np-config.json"));
    assert_eq!(config.branch.as_deref(), Some("release"));
    assert_eq!(config.two_factor, Some(false));
}

#[test]
fn test_package_json_key() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{"name": "pkg", "version": "1.0.0", "lionp": {"yolo": true, "testScript": "unit"}}"#,
    );

    let (_, config) = find_config(dir.path(), None).unwrap().unwrap();
    assert_eq!(config.yolo, Some(true));
    assert_eq!(config.test_script.as_deref(), Some("unit"));
}

#[test]
fn test_package_json_without_key_is_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", r#"{"name": "pkg", "version": "1.0.0"}"#);

    assert!(read_config_file(&dir.path().join("package.json")).unwrap().is_none());
    assert!(find_config(dir.path(), None).unwrap().is_none());
}

#[test]
fn test_dedicated_file_wins_over_package_json() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", r#"{"name": "pkg", "lionp": {"tag": "next"}}"#);
    write(dir.path(), ".np-config.json", r#"{"tag": "beta"}"#);

    let (_, config) = find_config(dir.path(), None).unwrap().unwrap();
    assert_eq!(config.tag.as_deref(), Some("beta"));
}

#[test]
fn test_found_in_ancestor() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("packages").join("core");
    fs::create_dir_all(&nested).unwrap();
    write(dir.path(), ".np-config.json", r#"{"anyBranch": true}"#);

    let (path, config) = find_config(&nested, None).unwrap().unwrap();
    assert_eq!(path, dir.path().join(".np-config.json"));
    assert_eq!(config.any_branch, Some(true));
}

#[test]
fn test_js_config() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        ".np-config.cjs",
        "module.exports = {\"releaseDraft\": false, \"message\": \"release %s\"};\n",
    );

    let (_, config) = find_config(dir.path(), None).unwrap().unwrap();
    assert_eq!(config.release_draft, Some(false));
    assert_eq!(config.message.as_deref(), Some("release %s"));
}

#[test]
fn test_js_config_must_export_object() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".np-config.js", "module.exports = require('./other');\n");

    let err = find_config(dir.path(), None).unwrap_err();
    assert!(matches!(err, LionpError::Config(_)));
}

#[test]
fn test_invalid_json_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".np-config.json", r#"{"cleanup": "yes"}"#);

    let err = find_config(dir.path(), None).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error: Invalid configuration in"));
}

#[test]
fn test_home_is_searched_last() {
    let project = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    write(home.path(), ".np-config.json", r#"{"preview": true}"#);

    let (path, config) = find_config(project.path(), Some(home.path())).unwrap().unwrap();
    assert_eq!(path, home.path().join(".np-config.json"));
    assert_eq!(config.preview, Some(true));
}

#[test]
#[serial]
fn test_load_config_uses_home_directory() {
    let project = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    write(home.path(), ".np-config.json", r#"{"branch": "trunk"}"#);

    let original = env::var_os("HOME");
    env::set_var("HOME", home.path());
    let config = load_config(project.path());
    match original {
        Some(value) => env::set_var("HOME", value),
        None => env::remove_var("HOME"),
    }

    assert_eq!(config.unwrap().branch.as_deref(), Some("trunk"));
}

#[test]
#[serial]
fn test_load_config_defaults_to_empty() {
    let project = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();

    let original = env::var_os("HOME");
    env::set_var("HOME", home.path());
    let config = load_config(project.path());
    match original {
        Some(value) => env::set_var("HOME", value),
        None => env::remove_var("HOME"),
    }

    assert_eq!(config.unwrap(), PartialConfig::default());
}
