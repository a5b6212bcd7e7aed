// integration tests for the config command

use std::fs;

use crate::common::*;

#[test]
fn test_config_show() {
    let env = TestEnv::new();
    let output = env.run(&["config", "show"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["ping"]["enabled"], false);
    assert_eq!(value["ping"]["interval_secs"], 5);
    assert_eq!(value["wake"]["method"], "packet");
}

#[test]
fn test_config_path() {
    let env = TestEnv::new();
    let output = env.run(&["config", "path"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), env.config.to_str().unwrap());
}

#[test]
fn test_config_default() {
    let env = TestEnv::new();
    let output = env.run(&["config", "default"]);

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["fifo"], "/tmp/motion-wol.fifo");
    assert_eq!(value["wake"]["command"], "wakeonlan");
}

#[test]
fn test_config_set_persists() {
    let env = TestEnv::new();

    let output = env.run(&["config", "set", "ping.interval_secs", "30"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Set ping.interval_secs = 30"));

    let output = env.run(&["config", "set", "wake.method", "command"]);
    assert!(output.status.success());

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&env.config).unwrap()).unwrap();
    assert_eq!(saved["ping"]["interval_secs"], 30);
    assert_eq!(saved["wake"]["method"], "command");
}

#[test]
fn test_config_set_rejects_bad_input() {
    let env = TestEnv::new();

    let output = env.run(&["config", "set", "nonsense", "1"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("Unknown config key"));

    let output = env.run(&["config", "set", "wake.broadcast", "everywhere"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_config_reset() {
    let env = TestEnv::new();
    let output = env.run(&["config", "reset"]);
    assert!(output.status.success());

    let output = env.run(&["config", "show"]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["ping"]["enabled"], true);
}

#[test]
fn test_config_verify_valid() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    let output = env.run(&["config", "verify"]);

    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(stdout(&output).contains("Configuration is valid"));
}

#[test]
fn test_config_verify_reports_errors() {
    let env = TestEnv::with_rules("wake 00:24:1d:d9:fa:09:\n    now Funday\n");
    let content = fs::read_to_string(&env.config).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&content).unwrap();
    value["ping"]["interval_secs"] = 0.into();
    fs::write(&env.config, value.to_string()).unwrap();

    let output = env.run_json(&["config", "verify"]);
    assert_eq!(output.status.code(), Some(5));
    let result = &json(&output)["result"];
    assert_eq!(result["valid"], false);
    let errors = result["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_config_verify_missing_file() {
    let env = TestEnv::new();
    fs::remove_file(&env.config).unwrap();

    let output = env.run(&["config", "verify"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("config file not found"));
}

#[test]
fn test_config_accepts_json5() {
    let env = TestEnv::new();
    fs::write(
        &env.config,
        "{\n  // comments are fine\n  ping: { enabled: false, interval_secs: 9, },\n}\n",
    )
    .unwrap();

    let output = env.run(&["config", "show"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["ping"]["interval_secs"], 9);
}

#[test]
fn test_invalid_config_is_config_error() {
    let env = TestEnv::new();
    fs::write(&env.config, "{ not json").unwrap();

    let output = env.run(&["check"]);
    assert_eq!(output.status.code(), Some(5));
}
