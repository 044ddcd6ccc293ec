use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn clean_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("lib.py"),
        "def add(a, b):\n    return a + b\n",
    )
    .unwrap();
    tmp
}

fn risky_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("app.py"),
        "def handler(user_input):\n    eval(user_input)\n",
    )
    .unwrap();
    tmp
}

#[test]
fn clean_project_passes_the_default_gate() {
    let project = clean_project();
    Command::cargo_bin("codepulse")
        .unwrap()
        .args(["audit", "--quiet"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Audit Report"));
}

#[test]
fn tainted_project_fails_the_default_gate_with_exit_2() {
    let project = risky_project();
    Command::cargo_bin("codepulse")
        .unwrap()
        .args(["audit", "--quiet"])
        .arg(project.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Tainted data reaches eval"));
}

#[test]
fn json_output_is_parseable() {
    let project = risky_project();
    let output = Command::cargo_bin("codepulse")
        .unwrap()
        .args(["audit", "--quiet", "--format", "json"])
        .arg(project.path())
        .output()
        .unwrap();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["critical_count"], 1);
    assert_eq!(report["dimensions"].as_array().unwrap().len(), 3);
}

#[test]
fn enforced_policy_overrides_the_default_gate() {
    let project = risky_project();
    let policies = project.path().join("policies.yml");
    fs::write(
        &policies,
        "policies:\n  - name: allow-everything\n    expr: \"overall_score >= 0\"\n    enforced: true\n",
    )
    .unwrap();

    Command::cargo_bin("codepulse")
        .unwrap()
        .args(["audit", "--quiet", "--policies"])
        .arg(&policies)
        .arg(project.path())
        .assert()
        .success();
}

#[test]
fn audit_writes_history_to_the_store() {
    let project = clean_project();
    let store = project.path().join("audits.jsonl");

    Command::cargo_bin("codepulse")
        .unwrap()
        .args(["audit", "--quiet", "--store"])
        .arg(&store)
        .arg(project.path())
        .assert()
        .success();

    Command::cargo_bin("codepulse")
        .unwrap()
        .args(["history", "--store"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("PAST RUNS"));
}

#[test]
fn history_without_a_store_fails_cleanly() {
    Command::cargo_bin("codepulse")
        .unwrap()
        .env("HOME", "/nonexistent")
        .arg("history")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no store file"));
}

#[test]
fn missing_path_is_an_error() {
    Command::cargo_bin("codepulse")
        .unwrap()
        .args(["audit", "--quiet", "/definitely/not/here"])
        .assert()
        .failure();
}
