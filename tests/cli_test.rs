use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn script(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "op, kind, value").unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg("tests/fixtures/redirect.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("transaction,outcome,detail"))
        .stdout(predicate::str::contains(",success,Authorised"));

    Ok(())
}

#[test]
fn test_cli_reports_pending_state() {
    let file = script(&["respond, challenge,", "connect, ,", "pay, card, 5.00"]);

    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",pending,awaiting external event"));
}

#[test]
fn test_cli_fatal_failure_rejects_later_steps() {
    let file = script(&[
        "respond, fatal, Card blocked",
        "connect, ,",
        "pay, card, 5.00",
        "details, threeDSResult, Y",
    ]);

    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",error,Refused"))
        .stderr(predicate::str::contains("Error applying step"))
        .stderr(predicate::str::contains("WARN"))
        .stderr(predicate::str::contains("is closed"));
}

#[test]
fn test_cli_skips_malformed_rows() {
    let file = script(&[
        "respond, finished, Authorised",
        "pay, card, -3",
        "pay, card, 3",
        "connect, ,",
    ]);

    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",success,Authorised"))
        .stderr(predicate::str::contains("Error reading step"));
}

#[test]
fn test_cli_uses_config_return_target() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, r#"{{"currency": "CNY", "return_target": "shop://done"}}"#).unwrap();
    let file = script(&["cancel, ,"]);

    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(file.path()).arg("--config").arg(config.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",canceled,"));
}

#[test]
fn test_cli_missing_script_fails() {
    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg("tests/fixtures/does_not_exist.csv");

    cmd.assert().failure();
}
