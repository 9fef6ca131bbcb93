//! CLI integration tests.
//!
//! These tests drive the objgrep binary via std::process::Command against
//! snapshot files written to a temporary directory.

use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

fn objgrep() -> Command {
    Command::new(env!("CARGO_BIN_EXE_objgrep"))
}

/// Write a small page snapshot and return its directory and path.
fn snapshot_fixture() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("page.json");
    let doc = json!({
        "global": {
            "app": {
                "config": {"port": 8080, "host": "Example.org", "debug": false},
                "Portal": "main",
                "items": [1, 2, 3]
            }
        }
    });
    std::fs::write(&path, doc.to_string()).unwrap();
    (dir, path)
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_human_search_prints_match_lines() {
    let (_dir, path) = snapshot_fixture();
    let output = objgrep()
        .arg("--graph")
        .arg(&path)
        .args(["search", "--by-name", "port", "--strict"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("window.app.config.port -> "));
    assert!(stdout.contains("(number) 8080"));
    assert!(stdout.contains("Completed in: "));
    assert!(stdout.trim_end().ends_with("Matches found: 1"));
}

#[test]
fn test_json_search_envelope() {
    let (_dir, path) = snapshot_fixture();
    let output = objgrep()
        .arg("--graph")
        .arg(&path)
        .args(["--output", "json", "search", "--by-name", "port"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let parsed: Value = serde_json::from_str(stdout_of(&output).trim()).unwrap();
    assert_eq!(parsed["tool"], "objgrep");
    assert_eq!(parsed["partial"], false);
    assert_eq!(parsed["data"]["search_kind"], "by-name");
    assert_eq!(parsed["data"]["total_count"], 2);

    let results = parsed["data"]["results"].as_array().unwrap();
    assert_eq!(results[0]["path"], "window.app.Portal");
    assert_eq!(results[1]["path"], "window.app.config.port");
    assert_eq!(results[1]["value"], 8080.0);
    assert_eq!(results[1]["kind"], "Number");
    assert_eq!(results[1]["match_id"].as_str().unwrap().len(), 16);
}

#[test]
fn test_by_value_numeric_text() {
    let (_dir, path) = snapshot_fixture();
    let output = objgrep()
        .arg("--graph")
        .arg(&path)
        .args(["--output", "json", "search", "--by-value", "8,080"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let parsed: Value = serde_json::from_str(stdout_of(&output).trim()).unwrap();
    let results = parsed["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["path"], "window.app.config.port");
}

#[test]
fn test_root_override_and_kind_search() {
    let (_dir, path) = snapshot_fixture();
    let output = objgrep()
        .arg("--graph")
        .arg(&path)
        .args([
            "--output",
            "json",
            "search",
            "--by-kind",
            "array",
            "--root",
            "window.app",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let parsed: Value = serde_json::from_str(stdout_of(&output).trim()).unwrap();
    let results = parsed["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["path"], "window.app.items");
    assert_eq!(parsed["data"]["root"], "window.app");
}

#[test]
fn test_max_nodes_marks_partial() {
    let (_dir, path) = snapshot_fixture();
    let output = objgrep()
        .arg("--graph")
        .arg(&path)
        .args(["--output", "json", "search", "--by-kind", "*", "--max-nodes", "1"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let parsed: Value = serde_json::from_str(stdout_of(&output).trim()).unwrap();
    assert_eq!(parsed["partial"], true);
    assert_eq!(parsed["data"]["stop_reason"], "node budget exhausted");
}

#[test]
fn test_kind_subcommand() {
    let (_dir, path) = snapshot_fixture();
    let output = objgrep()
        .arg("--graph")
        .arg(&path)
        .args(["kind", "window.app.items"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("window.app.items: Array"));
    assert!(stdout.contains("Array(3) [1, 2, 3]"));
}

#[test]
fn test_empty_query_is_an_error() {
    let (_dir, path) = snapshot_fixture();
    let output = objgrep()
        .arg("--graph")
        .arg(&path)
        .args(["search", "--by-name", ""])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("ERROR [OBJ-E012]"));
}

#[test]
fn test_missing_graph_reports_json_error() {
    let output = objgrep()
        .args(["--output", "json", "search", "--by-name", "x"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let parsed: Value = serde_json::from_str(stdout_of(&output).trim()).unwrap();
    assert_eq!(parsed["data"]["code"], "OBJ-E001");
}

#[test]
fn test_bad_root_path() {
    let (_dir, path) = snapshot_fixture();
    let output = objgrep()
        .arg("--graph")
        .arg(&path)
        .args(["search", "--by-name", "x", "--root", "window.app.config.port"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("OBJ-E018"));
}
