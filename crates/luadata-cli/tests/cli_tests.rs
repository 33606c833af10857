//! Integration tests for the `luadata` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to run the compare and pretty
//! subcommands against the fixture data files, covering report formats,
//! output placement, logging and error exits.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Helper: path to a file under tests/fixtures.
fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Helper: a fresh scratch directory for one test.
fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("luadata-cli-{}-{}", std::process::id(), test));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn luadata() -> Command {
    let mut cmd = Command::cargo_bin("luadata").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn pretty_into(input: &str, dir: &Path) -> String {
    luadata()
        .args(["pretty", "-f", input, "-o"])
        .arg(dir)
        .assert()
        .success();
    fs::read_to_string(dir.join("RoomData.lua")).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// compare
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn compare_reordered_files_are_equal() {
    luadata()
        .args(["compare", "-f", &fixture("old/RoomData.lua")])
        .args(["-f", &fixture("new/RoomData.lua")])
        .assert()
        .success()
        .stdout("equal: true\n");
}

#[test]
fn compare_changed_leaf_is_unequal() {
    luadata()
        .args(["compare", "-f", &fixture("old/RoomData.lua")])
        .args(["-f", &fixture("changed/RoomData.lua")])
        .assert()
        .success()
        .stdout("equal: false\n");
}

#[test]
fn compare_logs_checksums_to_stderr() {
    luadata()
        .args(["compare", "-f", &fixture("old/RoomData.lua")])
        .args(["-f", &fixture("new/RoomData.lua")])
        .assert()
        .success()
        .stderr(predicate::str::contains("comparing entry RoomData"))
        .stderr(predicate::str::contains("result: true"));
}

#[test]
fn compare_json_report() {
    let output = luadata()
        .args(["compare", "--json", "-f", &fixture("old/RoomData.lua")])
        .args(["-f", &fixture("changed/RoomData.lua")])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["entry"], "RoomData");
    assert_eq!(report["equal"], false);
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    for file in files {
        let checksum = file["checksum"].as_str().unwrap();
        assert_eq!(checksum.len(), 32);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(file["path"].as_str().unwrap().ends_with("RoomData.lua"));
    }
    assert_ne!(files[0]["checksum"], files[1]["checksum"]);
}

#[test]
fn compare_different_entries_fails() {
    luadata()
        .args(["compare", "-f", &fixture("old/RoomData.lua")])
        .args(["-f", &fixture("ItemData.lua")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry names differ"));
}

#[test]
fn compare_needs_two_files() {
    luadata()
        .args(["compare", "-f", &fixture("old/RoomData.lua")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least two files"));
}

#[test]
fn compare_ignores_extra_files() {
    luadata()
        .args(["compare", "-f", &fixture("old/RoomData.lua")])
        .args(["-f", &fixture("new/RoomData.lua")])
        .args(["-f", &fixture("ItemData.lua")])
        .assert()
        .success()
        .stdout("equal: true\n")
        .stderr(predicate::str::contains("ignoring 1 more"));
}

#[test]
fn compare_missing_file_fails() {
    luadata()
        .args(["compare", "-f", &fixture("old/RoomData.lua")])
        .args(["-f", &fixture("absent/RoomData.lua")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load data files"));
}

#[test]
fn compare_without_files_is_a_usage_error() {
    luadata()
        .arg("compare")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--file"));
}

#[test]
fn verbose_flag_enables_debug_logs() {
    luadata()
        .args(["-v", "compare", "-f", &fixture("old/RoomData.lua")])
        .args(["-f", &fixture("new/RoomData.lua")])
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG"));
}

// ─────────────────────────────────────────────────────────────────────────────
// pretty
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn pretty_writes_canonical_document() {
    let dir = scratch_dir("canonical");
    let document = pretty_into(&fixture("old/RoomData.lua"), &dir);

    assert!(document.starts_with(
        "-- $Id$\r\n\r\nmodule(\"Data\")\r\n\r\nRoomData=\r\n{\r\n\t[1]={\r\n\t\tname=\"Lobby\",\r\n\t\topen=true,\r\n\t\tseats={\r\n\t\t\t4,\r\n\t\t\t8,\r\n\t\t},\r\n\t},\r\n"
    ));
    assert!(document.contains("\t\tsize=12.500000,\r\n"));
    assert!(document.contains("\t\t\t[{\r\n\t\t\t\tdir=\"north\",\r\n\t\t\t}]=2,\r\n"));
    assert!(document.ends_with("\t},\r\n}\r\n"));
    assert!(!document.contains("md5sum"));
}

#[test]
fn pretty_outputs_match_for_reordered_files() {
    let old = pretty_into(&fixture("old/RoomData.lua"), &scratch_dir("match-old"));
    let new = pretty_into(&fixture("new/RoomData.lua"), &scratch_dir("match-new"));
    assert_eq!(old, new);
}

#[test]
fn pretty_prints_target_path() {
    let dir = scratch_dir("target");
    luadata()
        .args(["pretty", "-f", &fixture("old/RoomData.lua"), "-o"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::ends_with("RoomData.lua\n"));
}

#[test]
fn pretty_defaults_to_output_dir_next_to_input() {
    let dir = scratch_dir("default-output");
    let input = dir.join("RoomData_02.lua");
    fs::copy(fixture("old/RoomData.lua"), &input).unwrap();

    luadata().args(["pretty", "-f"]).arg(&input).assert().success();

    let written = dir.join("output").join("RoomData.lua");
    assert!(written.exists(), "{} was not written", written.display());
}

#[test]
fn pretty_is_idempotent() {
    let first_dir = scratch_dir("idempotent-1");
    let first = pretty_into(&fixture("new/RoomData.lua"), &first_dir);
    let written = first_dir.join("RoomData.lua");
    let second = pretty_into(written.to_str().unwrap(), &scratch_dir("idempotent-2"));
    assert_eq!(first, second);
}

#[test]
fn pretty_entry_must_exist() {
    let dir = scratch_dir("missing-entry");
    let input = dir.join("RoomData.lua");
    fs::copy(fixture("ItemData.lua"), &input).unwrap();

    luadata()
        .args(["pretty", "-f"])
        .arg(&input)
        .arg("-o")
        .arg(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry RoomData is missing"));
}

#[test]
fn pretty_entry_option_overrides_file_name() {
    let dir = scratch_dir("entry-option");
    let input = dir.join("RoomData.lua");
    fs::copy(fixture("ItemData.lua"), &input).unwrap();

    luadata()
        .args(["pretty", "--entry", "ItemData", "-f"])
        .arg(&input)
        .arg("-o")
        .arg(dir.join("out"))
        .assert()
        .success();

    let document = fs::read_to_string(dir.join("out").join("RoomData.lua")).unwrap();
    assert!(document.contains("\r\nItemData=\r\n"));
    assert!(document.contains("\t\tweight=0.250000,\r\n"));
}

#[test]
fn pretty_module_option() {
    let dir = scratch_dir("module-option");
    let input = dir.join("RoomData.lua");
    fs::write(&input, "module(\"Tables\")\nRoomData = { 1, 2 }\n").unwrap();

    luadata()
        .args(["pretty", "--module", "Tables", "-f"])
        .arg(&input)
        .arg("-o")
        .arg(dir.join("out"))
        .assert()
        .success();

    let document = fs::read_to_string(dir.join("out").join("RoomData.lua")).unwrap();
    assert_eq!(
        document,
        "-- $Id$\r\n\r\nmodule(\"Tables\")\r\n\r\nRoomData=\r\n{\r\n\t[1]=1,\r\n\t[2]=2,\r\n}\r\n"
    );
}

#[test]
fn pretty_syntax_error_fails() {
    let dir = scratch_dir("syntax-error");
    let input = dir.join("RoomData.lua");
    fs::write(&input, "module(\"Data\")\nRoomData = {\n").unwrap();

    luadata()
        .args(["pretty", "-f"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}
