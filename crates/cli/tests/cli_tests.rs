//! Integration tests for the bookshelf CLI

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("bookshelf-cli").unwrap();
    // Keep the run independent of any config next to the test binary.
    let empty = std::env::temp_dir().join("bookshelf-cli-tests-no-config");
    cmd.env("BOOKSHELF_CONFIG_DIR", empty)
        .env_remove("BOOKSHELF_ENV")
        .env_remove("BOOKSHELF_DATABASE__SNAPSHOT_PATH");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("openapi"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_openapi_documents_book_routes() {
    let output = cli().arg("openapi").output().unwrap();
    assert!(output.status.success());

    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(doc["paths"]["/api/books"]["post"].is_object());
    assert!(doc["paths"]["/api/books/{id}"]["patch"].is_object());
    assert!(doc["components"]["schemas"]["Book"].is_object());
}

#[test]
fn test_config_reflects_environment_overrides() {
    let output = cli()
        .arg("config")
        .env("BOOKSHELF_SERVER__PORT", "9321")
        .output()
        .unwrap();
    assert!(output.status.success());

    let settings: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["server"]["port"], 9321);
    assert_eq!(settings["environment"], "local");
}

#[test]
fn test_unknown_environment_fails() {
    cli()
        .arg("config")
        .env("BOOKSHELF_ENV", "qa")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported environment"));
}
