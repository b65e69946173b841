use std::process::{Command, Output};

use serde_json::Value;

fn lane_defence(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lane-defence"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(args)
        .output()
        .expect("failed to launch lane-defence")
}

/// Parses the JSON summary that follows the welcome banner on stdout.
fn summary(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let start = stdout.find('{').expect("summary is printed");
    serde_json::from_str(&stdout[start..]).expect("summary is valid JSON")
}

#[test]
fn scripted_build_is_applied_before_the_first_wave() {
    let output = lane_defence(&[
        "--scenario",
        "scenarios/crossroads.toml",
        "--ticks",
        "20",
        "--json",
        "--log-level",
        "warn",
    ]);
    assert!(output.status.success(), "{output:?}");

    let summary = summary(&output);
    assert_eq!(summary["map"], "Crossroads");
    assert_eq!(summary["state"], "PreWave");
    assert_eq!(summary["ticks"], 20);
    assert_eq!(summary["towers"], 4);
    assert_eq!(summary["walls"], 1);
    assert_eq!(summary["money"], 100);
    assert_eq!(summary["base_hp"], 10);
    assert_eq!(summary["enemies_alive"], 0);
}

#[test]
fn missing_scenario_fails_with_context() {
    let output = lane_defence(&["--scenario", "scenarios/does-not-exist.toml"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to read scenario"),
        "unexpected stderr: {stderr}"
    );
}
