// integration tests for commands that talk to the daemon

use std::fs::OpenOptions;
use std::io::Write;
use std::time::Duration;

use crate::common::*;

fn write_motion(env: &TestEnv) {
    let mut fifo = OpenOptions::new()
        .write(true)
        .open(env.fifo_path())
        .expect("Failed to open fifo");
    fifo.write_all(b"motion\n").unwrap();
}

#[test]
fn test_status_when_not_running() {
    let env = TestEnv::new();

    let output = env.run(&["status"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Daemon is not running"));

    let output = env.run_json(&["status"]);
    assert!(output.status.success());
    assert_eq!(json(&output)["result"]["running"], false);
}

#[test]
fn test_control_commands_need_a_daemon() {
    let env = TestEnv::new();

    for command in ["enable", "disable", "motion", "stop"] {
        let output = env.run(&[command]);
        assert_eq!(output.status.code(), Some(2), "{}", command);
        assert!(stderr(&output).contains("Daemon is not running"));
    }
}

#[test]
fn test_stale_pid_file_is_not_a_daemon() {
    let env = TestEnv::new();
    // pid files live next to the socket
    std::fs::write(env.path().join("control.pid"), "999999999").unwrap();

    let output = env.run_json(&["motion"]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(json(&output)["error"]["code"], -32002);
}

#[test]
fn test_daemon_refuses_broken_rules() {
    let env = TestEnv::with_rules("wake 00:24:1d:d9:fa:09:\n    now Funday\n");
    let output = env.run(&["daemon"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid rules file"));
    assert!(!env.path().join("motion.fifo").exists());
}

#[test]
fn test_fifo_motion_wakes_hosts() {
    let env = TestEnv::with_rules("wake 00:24:1d:d9:fa:09:\n    inactivity 0 s\n");
    env.configure(serde_json::json!({
        "wake": { "method": "command", "command": "true" },
    }));

    let mut daemon = env.spawn_daemon();
    assert!(
        wait_until(Duration::from_secs(10), || env.socket_path().exists()
            && env.pid_path().exists()),
        "daemon did not come up"
    );

    // the first motion is its own predecessor, so only the second one is
    // preceded by a quiet gap
    write_motion(&env);
    std::thread::sleep(Duration::from_millis(1100));
    write_motion(&env);

    let mut status = serde_json::Value::Null;
    let woken = wait_until(Duration::from_secs(5), || {
        let output = env.run_json(&["status"]);
        status = json(&output)["result"].clone();
        !status["hosts"][0]["last_wake"].is_null()
    });
    assert!(woken, "no wake recorded: {}", status);
    assert!(status["last_motion"].is_string());
    assert!(status["previous_motion"].is_string());
    assert_eq!(status["hosts"][0]["mac"], "00:24:1d:d9:fa:09");

    let output = env.run_json(&["stop"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(json(&output)["result"]["stopping"], true);

    assert!(daemon.wait_for_exit(Duration::from_secs(10)), "daemon did not exit");
    assert!(!env.fifo_path().exists());
    assert!(!env.socket_path().exists());
    assert!(!env.pid_path().exists());
}
