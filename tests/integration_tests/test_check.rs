// integration tests for the check command

use crate::common::*;

#[test]
fn test_check_lists_rules() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    let output = env.run(&["check"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("wake 00:24:1d:d9:fa:09 (hold off 300s)"), "{}", out);
    assert!(out.contains("wake 00:11:12:13:14:15 192.168.1.101"), "{}", out);
    assert!(out.contains("2 rule(s)"), "{}", out);
}

#[test]
fn test_check_json_output() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    let output = env.run_json(&["check"]);

    assert!(output.status.success());
    let value = json(&output);
    assert_eq!(value["jsonrpc"], "2.0");
    let rules = value["result"]["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["mac"], "00:24:1d:d9:fa:09");
    assert_eq!(rules[0]["hold_off"], 300);
    assert!(rules[0].get("address").is_none());
    assert_eq!(rules[1]["address"], "192.168.1.101");
}

#[test]
fn test_check_explicit_path() {
    let env = TestEnv::new();
    let other = env.path().join("other-rules");
    std::fs::write(&other, "wake 00:00:00:00:00:01:\n    now Sat Sun\n").unwrap();

    let output = env.run_json(&["check", other.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(json(&output)["result"]["rules"].as_array().unwrap().len(), 1);
}

#[test]
fn test_check_reports_parse_error_with_line() {
    let env = TestEnv::with_rules("wake 00:24:1d:d9:fa:09:\n    now Mon\n    now not sun\n");
    let output = env.run_json(&["check"]);

    assert_eq!(output.status.code(), Some(3));
    let value = json(&output);
    assert_eq!(value["error"]["code"], -32003);
    assert_eq!(value["error"]["data"]["line"], 3);
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("did you mean 'Sun'?"));
}

#[test]
fn test_check_configuration_error_has_details() {
    let env = TestEnv::with_rules("wake 00:00:00:00:00:01:\n    hold off 1 min\n    hold off 2 min\n");
    let output = env.run_json(&["check"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(json(&output)["error"]["data"]["details"].is_string());
}

#[test]
fn test_check_text_error_goes_to_stderr() {
    let env = TestEnv::with_rules("wake 00:24:1d:d9:fa:09:\n\tnow Mon\n");
    let output = env.run(&["check"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("line 2"), "{}", stderr(&output));
}

#[test]
fn test_check_missing_rules_file() {
    let env = TestEnv::new();
    let output = env.run(&["check"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to read rules file"));
}

#[test]
fn test_check_quiet() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    let output = env.run(&["--quiet", "check"]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}
