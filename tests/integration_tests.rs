//! CLI smoke tests: help, config inspection, and snapshot replay.

mod common;

use std::fs;
use std::path::Path;

use serde_json::{Value, json};

fn write_config(dir: &Path) -> String {
    let path = dir.join("config.toml");
    fs::write(&path, "[refresh]\ninterval_ms = 100\n").expect("write config");
    path.to_string_lossy().into_owned()
}

fn conn(pid: u32, local: &str, remote: &str, state: &str) -> Value {
    json!({
        "pid": pid,
        "protocol": "tcp",
        "local": local,
        "remote": remote,
        "state": state,
    })
}

fn app(name: &str, pid: u32, connections: Vec<Value>) -> Value {
    json!({
        "name": name,
        "exe_path": format!("/usr/bin/{name}"),
        "pids": [pid],
        "connections": connections,
    })
}

fn write_frames(dir: &Path) -> String {
    let first = json!({
        "applications": [
            app("nginx", 10, vec![conn(10, "10.0.0.1:80", "", "LISTEN")]),
        ],
        "collected_at": "2026-01-01T00:00:00Z",
    });
    let second = json!({
        "applications": [
            app("curl", 20, vec![conn(20, "10.0.0.2:51000", "192.0.2.9:443", "ESTABLISHED")]),
            app("nginx", 10, vec![
                conn(10, "10.0.0.1:80", "", "LISTEN"),
                conn(10, "10.0.0.1:443", "192.0.2.5:40000", "ESTABLISHED"),
            ]),
        ],
        "collected_at": "2026-01-01T00:00:01Z",
    });
    let path = dir.join("frames.jsonl");
    fs::write(&path, format!("{first}\n{second}\n")).expect("write frames");
    path.to_string_lossy().into_owned()
}

fn frames(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("frame is JSON"))
        .collect()
}

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: connwatch [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn config_show_reports_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let result = common::run_cli_case("config_show", &["config", "show", "--config", &config]);
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["command"], "config show");
    assert_eq!(payload["config"]["refresh"]["interval_ms"], 100);
}

#[test]
fn missing_explicit_config_is_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let result = common::run_cli_case(
        "missing_config",
        &["config", "show", "--config", &missing.to_string_lossy()],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("CW-1002"));
}

#[test]
fn replay_prints_one_frame_per_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let snapshots = write_frames(dir.path());
    let result = common::run_cli_case(
        "replay_frames",
        &["replay", "--config", &config, "--snapshots", &snapshots],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let frames = frames(&result.stdout);
    assert_eq!(frames.len(), 2, "log: {}", result.log_path.display());
    assert_eq!(frames[0]["rows"], json!(["nginx"]));
    assert_eq!(frames[0]["changes"], 0);
    assert_eq!(frames[1]["rows"], json!(["curl", "nginx"]));
    assert_eq!(frames[1]["changes"], 2);
    assert_eq!(frames[1]["selection"], "nginx");
    assert_eq!(frames[1]["cursor"], 1);
    assert_eq!(frames[1]["level"], "processes");
}

#[test]
fn replay_honors_the_port_filter() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let snapshots = write_frames(dir.path());
    let result = common::run_cli_case(
        "replay_port_filter",
        &[
            "replay",
            "--config",
            &config,
            "--snapshots",
            &snapshots,
            "--port-filter",
            "443",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let frames = frames(&result.stdout);
    assert_eq!(frames[0]["rows"], json!([]));
    assert_eq!(frames[0]["selection"], Value::Null);
    assert_eq!(frames[1]["rows"], json!(["curl", "nginx"]));
}

#[test]
fn replay_of_empty_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let empty = dir.path().join("empty.jsonl");
    fs::write(&empty, "\n").unwrap();
    let result = common::run_cli_case(
        "replay_empty",
        &[
            "replay",
            "--config",
            &config,
            "--snapshots",
            &empty.to_string_lossy(),
        ],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("contains no snapshots"));
}
