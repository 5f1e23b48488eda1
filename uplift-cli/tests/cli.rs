//! CLI behaviour tests against scratch projects.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MANIFEST: &str = r#"[package]
name = "demo"
version = "0.1.0"

# pinned until the web stack moves
[dependencies]
PackageA = "1.0"
serde = "1"
"#;

const MAP: &str = r#"[
  { "name": "web", "match": [{ "name": "PackageA", "version": "<2.0" }],
    "replacements": [{ "name": "PackageB", "version": "2.0" }] }
]"#;

fn uplift() -> Command {
    Command::cargo_bin("uplift").expect("uplift binary")
}

fn create_project(manifest: &str) -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    fs::write(td.path().join("Cargo.toml"), manifest).unwrap();
    fs::write(td.path().join("uplift-map.json"), MAP).unwrap();
    td
}

fn manifest(root: &Path) -> String {
    fs::read_to_string(root.join("Cargo.toml")).unwrap()
}

#[test]
fn list_steps_in_order() {
    let temp = create_project(MANIFEST);

    uplift()
        .current_dir(temp.path())
        .arg("list-steps")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("backup: Back up project"))
        .stdout(predicate::str::contains("update-references: Update dependency references"))
        .stdout(predicate::str::contains("depends on: backup"));
}

#[test]
fn list_steps_as_json() {
    let temp = create_project(MANIFEST);

    let output = uplift()
        .current_dir(temp.path())
        .args(["list-steps", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let steps: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(steps[0]["id"], "backup");
    assert_eq!(steps[1]["id"], "update-references");
    assert_eq!(steps[1]["depends_on"][0], "backup");
}

#[test]
fn plan_previews_without_writing() {
    let temp = create_project(MANIFEST);

    uplift()
        .current_dir(temp.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 references need updating"))
        .stdout(predicate::str::contains("A run would apply: backup, update-references"))
        .stdout(predicate::str::contains("-PackageA = \"1.0\""))
        .stdout(predicate::str::contains("+PackageB = \"2.0\""));

    assert_eq!(manifest(temp.path()), MANIFEST);
    assert!(!temp.path().join("Cargo.toml.uplift.bak").exists());
}

#[test]
fn run_rewrites_backs_up_and_writes_report() {
    let temp = create_project(MANIFEST);

    uplift()
        .current_dir(temp.path())
        .args(["run", "--report", "out/report.json"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("References updated"))
        .stdout(predicate::str::contains("All steps complete"));

    let after = manifest(temp.path());
    assert!(after.contains("PackageB = \"2.0\""));
    assert!(after.contains("uplift-support = \"1.0.0\""));
    assert!(after.contains("# pinned until the web stack moves"));
    assert!(!after.contains("PackageA"));

    let backup = fs::read_to_string(temp.path().join("Cargo.toml.uplift.bak")).unwrap();
    assert_eq!(backup, MANIFEST);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("out/report.json")).unwrap())
            .unwrap();
    assert_eq!(report["schema"], "uplift.run.v1");
    assert_eq!(report["outcome"]["kind"], "all_complete");
    assert_eq!(report["steps"][1]["disposition"], "applied");
}

#[test]
fn second_run_changes_nothing() {
    let temp = create_project(MANIFEST);

    uplift().current_dir(temp.path()).arg("run").assert().success();
    let first = manifest(temp.path());

    uplift()
        .current_dir(temp.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("No reference updates needed"));
    assert_eq!(manifest(temp.path()), first);
}

#[test]
fn no_backup_flag() {
    let temp = create_project(MANIFEST);

    uplift()
        .current_dir(temp.path())
        .args(["run", "--no-backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backups disabled"));
    assert!(!temp.path().join("Cargo.toml.uplift.bak").exists());
}

#[test]
fn missing_map_exits_two() {
    let temp = create_project(MANIFEST);

    uplift()
        .current_dir(temp.path())
        .args(["run", "--map", "nope.json"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Reference map nope.json not found"));
    assert_eq!(manifest(temp.path()), MANIFEST);
}

#[test]
fn malformed_project_fails_reference_step() {
    let temp = create_project("[dependencies\n");

    uplift()
        .current_dir(temp.path())
        .args(["run", "--no-backup"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Invalid project: Cargo.toml"));
}

#[test]
fn unsupported_reference_blocks_unless_ignored() {
    let temp = create_project(MANIFEST);

    uplift()
        .current_dir(temp.path())
        .args(["run", "--unsupported", "serde*"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Unsupported references: serde@1"));
    assert!(manifest(temp.path()).contains("PackageA"));

    uplift()
        .current_dir(temp.path())
        .args(["run", "--unsupported", "serde*", "--ignore-unsupported"])
        .assert()
        .success();
    assert!(!manifest(temp.path()).contains("PackageA"));
}

#[test]
fn config_file_next_to_project_is_used() {
    let temp = create_project(MANIFEST);
    fs::create_dir_all(temp.path().join("maps")).unwrap();
    fs::rename(
        temp.path().join("uplift-map.json"),
        temp.path().join("maps/refs.json"),
    )
    .unwrap();
    fs::write(
        temp.path().join("uplift.toml"),
        r#"
[map]
path = "maps/refs.json"

[support]
name = "compat-shim"
version = "2.1.0"

[steps]
skip = ["backup"]
"#,
    )
    .unwrap();

    uplift()
        .current_dir(temp.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped by operator"));

    let after = manifest(temp.path());
    assert!(after.contains("compat-shim = \"2.1.0\""));
    assert!(after.contains("PackageB"));
    assert!(!temp.path().join("Cargo.toml.uplift.bak").exists());
}

#[test]
fn project_in_subdirectory_resolves_its_own_map() {
    let temp = create_project(MANIFEST);

    uplift()
        .current_dir(temp.path().parent().unwrap())
        .args(["plan", "--project"])
        .arg(temp.path().join("Cargo.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 references need updating"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = create_project(MANIFEST);

    uplift()
        .current_dir(temp.path())
        .args(["run", "--config", "absent.toml"])
        .assert()
        .code(1);
    assert_eq!(manifest(temp.path()), MANIFEST);
}

#[test]
fn unknown_subcommand_fails() {
    uplift().arg("frobnicate").assert().failure();
}
