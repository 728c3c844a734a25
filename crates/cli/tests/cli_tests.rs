//! CLI integration tests

use std::process::{Command, Output};

fn hpp(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hpp"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = hpp(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Housing Price Predictor"),
        "Should show app name"
    );
    assert!(stdout.contains("session"), "Should show session command");
    assert!(stdout.contains("artifact"), "Should show artifact command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("reset"), "Should show reset command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("fields"), "Should show fields command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = hpp(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("hpp"), "Should show binary name");
}

#[test]
fn test_session_create_help() {
    let output = hpp(&["session", "create", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--scaler"), "Should show scaler option");
    assert!(stdout.contains("--model"), "Should show model option");
}

#[test]
fn test_predict_help_lists_form_fields() {
    let output = hpp(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in [
        "--square-meters",
        "--number-of-rooms",
        "--city-part-range",
        "--made",
        "--has-storage-room",
        "--has-guest-room",
    ] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

#[test]
fn test_artifact_load_requires_both_files() {
    let output = hpp(&["artifact", "load", "some-id", "--scaler", "scaler.json"]);
    assert!(!output.status.success(), "Missing --model should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--model"));
}

#[test]
fn test_session_create_scaler_requires_model() {
    let output = hpp(&["session", "create", "--scaler", "scaler.json"]);
    assert!(!output.status.success());
}

/// Out-of-range values never reach the server
#[test]
fn test_predict_rejects_out_of_range_value() {
    let output = hpp(&[
        "--api-url",
        "http://127.0.0.1:1",
        "predict",
        "some-id",
        "--city-part-range",
        "11",
    ]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("11"), "Should mention the rejected value");
    assert!(!stderr.contains("Failed to send request"));
}

#[test]
fn test_format_option() {
    let output = hpp(&["--format", "xml", "health"]);
    assert!(!output.status.success(), "Unknown format should fail");
}

#[test]
fn test_invalid_command() {
    let output = hpp(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_missing_argument() {
    let output = hpp(&["reset"]);
    assert!(!output.status.success(), "Missing session id should fail");
}

#[test]
fn test_unreachable_server_reports_error() {
    let output = hpp(&["--api-url", "http://127.0.0.1:1", "health"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to send request"));
}
