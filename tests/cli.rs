use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const EXIT_BAD_CONFIG: i32 = 0xA0;

fn transfer_cmd() -> Command {
    let mut cmd = Command::cargo_bin("blob-transfer").expect("binary exists");
    cmd.env_remove("BLOB_TRANSFER_SOURCE_SAS_SECRET_FILE")
        .env_remove("BLOB_TRANSFER_TARGET_SAS_SECRET_FILE")
        .env_remove("BLOB_TRANSFER_PAGE_SIZE");
    cmd
}

#[test]
fn missing_secret_env_vars_exit_with_the_config_code() {
    transfer_cmd()
        .arg("run")
        .assert()
        .failure()
        .code(EXIT_BAD_CONFIG);
}

#[test]
fn missing_secret_file_exits_with_the_config_code() {
    let dir = tempdir().expect("create temp dir");
    let missing = dir.path().join("no-such-secret.json");

    transfer_cmd()
        .arg("run")
        .env("BLOB_TRANSFER_SOURCE_SAS_SECRET_FILE", &missing)
        .env("BLOB_TRANSFER_TARGET_SAS_SECRET_FILE", &missing)
        .assert()
        .failure()
        .code(EXIT_BAD_CONFIG);
}

#[test]
fn invalid_sas_uri_exits_with_the_config_code() {
    let dir = tempdir().expect("create temp dir");
    let source = dir.path().join("source.json");
    let target = dir.path().join("target.json");
    fs::write(&source, r#"{"sourceSasUri": "::not-a-uri::"}"#).expect("write source secret");
    fs::write(&target, r#"{"targetSasUri": "::not-a-uri::"}"#).expect("write target secret");

    transfer_cmd()
        .arg("run")
        .env("BLOB_TRANSFER_SOURCE_SAS_SECRET_FILE", &source)
        .env("BLOB_TRANSFER_TARGET_SAS_SECRET_FILE", &target)
        .assert()
        .failure()
        .code(EXIT_BAD_CONFIG);
}

#[test]
fn help_lists_the_run_subcommand() {
    transfer_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"));
}
