//! Integration tests for the hostbridge binary.

use std::net::TcpListener;
use std::process::{Command, Output};

use serde_json::Value;

fn hostbridge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hostbridge"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to spawn hostbridge")
}

// ────────────────────────────────────────────────────────────────────────────
// config
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_prints_payload() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = dir.path().to_str().unwrap();

    let output = hostbridge(&["config", "--plugins", plugins]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let payload: Value = serde_json::from_slice(&output.stdout).expect("stdout is not JSON");
    let modules = payload["remoteModuleConfig"].as_object().unwrap();
    let names: Vec<&String> = modules.keys().collect();
    assert!(names.len() >= 2);
    assert_eq!(names[names.len() - 2], "SourceCode");
    assert_eq!(names[names.len() - 1], "UIManager");

    // Module IDs follow registration order.
    for (expected, module) in modules.values().enumerate() {
        assert_eq!(module["moduleID"], Value::from(expected as u64));
    }
}

#[test]
fn test_config_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("hostbridge.toml");
    std::fs::write(
        &config,
        format!("plugins_path = {:?}\nexecutor_name = \"NetExecutor\"\n", dir.path().join("none")),
    )
    .unwrap();

    let output = hostbridge(&["config", "--pretty", "-c", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("\n  \"remoteModuleConfig\""));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");

    let output = hostbridge(&["config", "-c", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.toml"), "{}", stderr);
}

// ────────────────────────────────────────────────────────────────────────────
// modules
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_modules_lists_registry() {
    let dir = tempfile::tempdir().unwrap();
    let output = hostbridge(&["modules", "--plugins", dir.path().to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("SourceCode"));
    assert!(text.contains("UIManager"));
    assert!(text.contains("[promise]"));
    assert!(text.contains(" modules"));
}

// ────────────────────────────────────────────────────────────────────────────
// run
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_run_without_runtime_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("index.bundle");
    std::fs::write(&bundle, "").unwrap();

    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let proxy = format!("ws://{}/debugger-proxy", addr);

    let output = hostbridge(&[
        "run",
        bundle.to_str().unwrap(),
        "--plugins",
        dir.path().to_str().unwrap(),
        "--proxy",
        &proxy,
        "--ready-timeout",
        "2",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: "), "{}", stderr);
}
