#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the feignkit binary

use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn run_feignkit(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_feignkit"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute feignkit")
}

fn write_config(dir: &TempDir, yaml: &str) -> String {
    let path = dir.path().join("feign.yaml");
    std::fs::write(&path, yaml).expect("Failed to write config");
    path_arg(&path)
}

fn path_arg(path: &Path) -> String {
    path.to_str().expect("temp path is UTF-8").to_owned()
}

const VALID: &str = r"
client:
  config:
    default:
      logger_level: basic
    users:
      logger_level: full
      read_timeout: 5s
clients:
  - name: users
    url: http://localhost:8080
    qualifiers: [primaryUsers]
  - name: billing
    async: true
";

#[test]
fn test_cli_help_command() {
    let output = run_feignkit(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(
        stdout.contains("print-config"),
        "Should contain 'print-config' subcommand"
    );
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_missing_config_file() {
    let output = run_feignkit(&["--config", "/nonexistent/feign.yaml", "check"]);

    assert!(!output.status.success(), "Should fail for a missing file");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("not found"),
        "Should indicate config file not found: {stderr}"
    );
}

#[test]
fn test_cli_check_lists_aliases() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(&dir, VALID);

    let output = run_feignkit(&["--config", &config, "check"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "check should succeed: {stderr}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration is valid"));
    assert!(stdout.contains("users -> primaryUsers"), "stdout: {stdout}");
    assert!(
        stdout.contains("billing -> billingAsyncFeignClient"),
        "stdout: {stdout}"
    );
}

#[test]
fn test_cli_check_rejects_illegal_hostname() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(
        &dir,
        r"
clients:
  - name: foo_bar
",
    );

    let output = run_feignkit(&["--config", &config, "check"]);

    assert!(!output.status.success(), "check should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Service id not legal hostname (foo_bar)"),
        "stderr: {stderr}"
    );
}

#[test]
fn test_cli_unknown_interceptor_needs_lenient() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(
        &dir,
        r"
client:
  config:
    default:
      request_interceptors: [auth]
clients:
  - name: users
",
    );

    let strict = run_feignkit(&["--config", &config, "check"]);
    assert!(!strict.status.success(), "strict check should fail");
    let stderr = String::from_utf8_lossy(&strict.stderr);
    assert!(stderr.contains("auth"), "stderr: {stderr}");

    let lenient = run_feignkit(&["--config", &config, "--lenient", "check"]);
    assert!(lenient.status.success(), "lenient check should succeed");
}

#[test]
fn test_cli_print_config_emits_effective_json() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(&dir, VALID);

    let output = run_feignkit(&["--config", &config, "print-config"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "print-config should succeed: {stderr}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    let clients = report["clients"].as_array().unwrap();
    assert_eq!(clients.len(), 2);

    let users = &clients[0];
    assert_eq!(users["context_id"], "users");
    assert_eq!(users["target_url"], "http://localhost:8080");
    assert_eq!(users["effective"]["log_level"], "full");
    assert_eq!(users["effective"]["read_timeout"], "5s");
    assert_eq!(users["aliases"][0], "primaryUsers");

    let billing = &clients[1];
    assert_eq!(billing["is_async"], true);
    assert_eq!(billing["effective"]["log_level"], "basic");
    assert_eq!(report["properties"]["httpclient"]["max_connections"], 200);
}
