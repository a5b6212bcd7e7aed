// integration tests for the eval command

use crate::common::*;

// 2024-06-05 is a Wednesday, 2024-06-09 a Sunday

#[test]
fn test_eval_wakes_matching_hosts() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    let output = env.run_json(&["eval", "--at", "2024-06-05T12:00:00+02:00", "--idle", "3600"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let result = &json(&output)["result"];
    assert_eq!(result["at"], "2024-06-05T12:00:00+02:00");
    assert_eq!(result["previous_motion"], "2024-06-05T11:00:00+02:00");
    assert_eq!(
        result["wake"],
        serde_json::json!(["00:24:1d:d9:fa:09", "192.168.1.101 00:11:12:13:14:15"])
    );
}

#[test]
fn test_eval_uses_local_time_of_the_offset() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    // 20:00 local is outside the second rule's window even though it is 18:00 UTC
    let output = env.run_json(&["eval", "--at", "2024-06-05T20:00:00+02:00", "--idle", "7200"]);

    assert!(output.status.success());
    assert_eq!(
        json(&output)["result"]["wake"],
        serde_json::json!(["00:24:1d:d9:fa:09"])
    );
}

#[test]
fn test_eval_nothing_to_wake() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    let output = env.run(&["eval", "--at", "2024-06-09T12:00:00+00:00", "--idle", "60"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("no hosts would be woken"));
}

#[test]
fn test_eval_without_previous_motion_counts_as_inactive() {
    let env = TestEnv::with_rules("wake 00:00:00:00:00:01:\n    inactivity 1 h\n");
    let output = env.run_json(&["eval", "--at", "2024-06-09T12:00:00+00:00"]);

    assert!(output.status.success());
    let result = &json(&output)["result"];
    assert!(result.get("previous_motion").is_none());
    assert_eq!(result["wake"], serde_json::json!(["00:00:00:00:00:01"]));
}

#[test]
fn test_eval_text_lists_hosts() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    let output = env.run(&["eval", "--at", "2024-06-05T12:00:00+02:00", "--idle", "3600"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("would wake:"), "{}", out);
    assert!(out.contains("  00:24:1d:d9:fa:09"), "{}", out);
}

#[test]
fn test_eval_invalid_time() {
    let env = TestEnv::with_rules(SAMPLE_RULES);
    let output = env.run(&["eval", "--at", "noon"]);

    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("invalid --at time 'noon'"));
}

#[test]
fn test_eval_broken_rules() {
    let env = TestEnv::with_rules("wake 00:24:1d:d9:fa:09:\n    12:00 < now < 10:00\n");
    let output = env.run(&["eval"]);

    assert_eq!(output.status.code(), Some(3));
}
