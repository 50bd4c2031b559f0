use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn yulstack() -> Command {
    let mut cmd = Command::cargo_bin("yulstack").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn check_accepts_valid_source() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "ok.yul", "{ let x := 1 sstore(0, x) }");

    yulstack()
        .arg("check")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("VALID"));
}

#[test]
fn check_reports_diagnostics() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "bad.yul", "{ let x := y }");

    yulstack()
        .arg("check")
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID"))
        .stderr(predicate::str::contains("DeclarationError: Identifier \"y\" not found."))
        .stderr(predicate::str::contains("bad.yul:1:12"));
}

#[test]
fn check_json_output() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "bad.yul", "{ pop(1, 2) }");

    yulstack()
        .args(["check", "--json"])
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"kind\": \"TypeError\""));
}

#[test]
fn print_typed_source() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "typed.yul", "{ let b:bool := true let n := 7:u256 }");

    yulstack()
        .args(["print", "--language", "yul"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            "object \"object\" {\n    code {\n        let b:bool := true\n        let n := 7\n    }\n}\n",
        );
}

#[test]
fn print_to_file() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "in.yul", r#"object "A" { code { } data "D" "hi" }"#);
    let output = dir.path().join("out.yul");

    yulstack()
        .arg("print")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Written to"));

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "object \"A\" {\n    code { }\n    data \"D\" hex\"6869\"\n}\n"
    );
}

#[test]
fn invalid_settings_are_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "ok.yul", "{ }");
    let settings = write(&dir, "settings.json", "{ \"runYulOptimiser\": 3 }");

    yulstack()
        .arg("check")
        .arg(&input)
        .arg("--settings")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid optimiser settings"));
}

#[test]
fn unknown_evm_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "ok.yul", "{ }");

    yulstack()
        .args(["check", "--evm-version", "frontier"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown EVM version"));
}

#[test]
fn older_evm_versions_lack_newer_opcodes() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "chain.yul", "{ sstore(0, chainid()) }");

    yulstack()
        .args(["check", "--evm-version", "petersburg"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("chainid"));

    yulstack()
        .args(["check", "--evm-version", "istanbul"])
        .arg(&input)
        .assert()
        .success();
}
