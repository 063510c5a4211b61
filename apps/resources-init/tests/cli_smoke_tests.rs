#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the resources-init binary
//!
//! Each test drives the compiled binary against throwaway `SQLite` files.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

/// Run the binary with a clean `APP__*` / `RUST_LOG` environment.
fn run_resources_init(args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_resources-init"));
    for (key, _) in std::env::vars() {
        if key.starts_with("APP__") {
            cmd.env_remove(key);
        }
    }
    cmd.env_remove("RUST_LOG")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute resources-init")
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

fn sqlite_config(dir: &Path, extra: &str) -> PathBuf {
    let dsn = format!("sqlite://{}", dir.join("master.db").display());
    write_config(
        dir,
        &format!(
            "database:\n  dsn: \"{dsn}\"\nresources:\n  seeder:\n    app_names: [VisualAcademy]\n{extra}"
        ),
    )
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_cli_help_command() {
    let output = run_resources_init(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    for command in ["run", "check", "list", "move"] {
        assert!(stdout.contains(command), "Should list '{command}'");
    }
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_missing_config_file() {
    let output = run_resources_init(&["--config", "/nonexistent/config.yaml", "check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn test_cli_check_requires_dsn() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "logging:\n  level: warn\n");

    let output = run_resources_init(&["--config", config.to_str().unwrap(), "check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("database.dsn is required"), "{stderr}");
}

#[test]
fn test_cli_check_valid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = sqlite_config(temp_dir.path(), "");

    let output = run_resources_init(&["--config", config.to_str().unwrap(), "check"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration is valid"), "{stdout}");
    assert!(stdout.contains("VisualAcademy"), "{stdout}");
}

#[test]
fn test_cli_rejects_unknown_config_key() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "resources:\n  stores: orm\n");

    let output = run_resources_init(&["--config", config.to_str().unwrap(), "check"]);

    assert!(!output.status.success());
}

#[test]
fn test_cli_run_then_list_and_move() {
    let temp_dir = TempDir::new().unwrap();
    let config = sqlite_config(temp_dir.path(), "");
    let config = config.to_str().unwrap();

    let output = run_resources_init(&["--config", config, "run"]);
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("master"));

    let page = stdout_json(&run_resources_init(&[
        "--config",
        config,
        "list",
        "--app",
        "VisualAcademy",
        "--search",
        "admin",
        "--size",
        "5",
    ]));
    assert_eq!(page["total_count"], 2);
    let items = page["items"].as_array().unwrap();
    assert_eq!(items[0]["alias"], "BlogAdmin");
    assert_eq!(items[1]["alias"], "Admin");

    let admin_id = items[1]["id"].as_i64().unwrap().to_string();
    let moved = stdout_json(&run_resources_init(&[
        "--config", config, "move", "--id", &admin_id, "--up",
    ]));
    assert_eq!(moved["moved"], true);
    assert_eq!(moved["direction"], "up");
}

#[test]
fn test_cli_move_requires_direction() {
    let output = run_resources_init(&["move", "--id", "1"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--up") || stderr.contains("required"), "{stderr}");
}

#[test]
fn test_cli_run_skips_when_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(
        temp_dir.path(),
        "resources:\n  initializer:\n    enable: false\n",
    );

    let output = run_resources_init(&["--config", config.to_str().unwrap(), "run"]);

    assert!(output.status.success());
    assert!(!temp_dir.path().join("master.db").exists());
}
