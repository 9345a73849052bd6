// tests/cli_test.rs
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn lionp() -> Command {
    Command::cargo_bin("lionp").unwrap()
}

#[test]
fn test_help_lists_flags() {
    lionp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--any-branch"))
        .stdout(predicate::str::contains("--release-draft-only"))
        .stdout(predicate::str::contains("--no-2fa"))
        .stdout(predicate::str::contains("prerelease"));
}

#[test]
fn test_version() {
    lionp()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_flag() {
    lionp()
        .arg("--contents=dist")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_outside_a_package() {
    let dir = TempDir::new().unwrap();
    lionp()
        .current_dir(dir.path())
        .arg("patch")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No `package.json` found"));
}
