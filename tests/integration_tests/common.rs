// shared utilities for integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;

pub const SAMPLE_RULES: &str = "\
# office machine
wake 00:24:1d:d9:fa:09:
    inactivity 10 min
    hold off 5 min
    now not Sun

wake 00:11:12:13:14:15 192.168.1.101:
    08:00 < now < 18:00
    any:
        now Mon Tue Wed
        inactivity 1 h
";

pub fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_motion-wol"))
}

/// a scratch directory holding a config that keeps every path inside it
pub struct TestEnv {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create test directory");
        let config = dir.path().join("config.json");
        let content = serde_json::json!({
            "rules": dir.path().join("rules").to_string_lossy(),
            "fifo": dir.path().join("motion.fifo").to_string_lossy(),
            "socket": dir.path().join("control.sock").to_string_lossy(),
            "ping": { "enabled": false },
        });
        fs::write(&config, serde_json::to_string_pretty(&content).unwrap())
            .expect("Failed to write test config");
        Self { dir, config }
    }

    /// overwrite top-level config keys
    pub fn configure(&self, settings: serde_json::Value) {
        let content = fs::read_to_string(&self.config).expect("Failed to read test config");
        let mut config: serde_json::Value = serde_json::from_str(&content).unwrap();
        if let (Some(config), Some(settings)) = (config.as_object_mut(), settings.as_object()) {
            for (key, value) in settings {
                config.insert(key.clone(), value.clone());
            }
        }
        fs::write(&self.config, serde_json::to_string_pretty(&config).unwrap())
            .expect("Failed to write test config");
    }

    pub fn with_rules(text: &str) -> Self {
        let env = Self::new();
        env.write_rules(text);
        env
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn rules_path(&self) -> PathBuf {
        self.path().join("rules")
    }

    pub fn write_rules(&self, text: &str) {
        fs::write(self.rules_path(), text).expect("Failed to write rules");
    }

    pub fn fifo_path(&self) -> PathBuf {
        self.path().join("motion.fifo")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.path().join("control.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.path().join("control.pid")
    }

    /// start `motion-wol daemon` in the background
    pub fn spawn_daemon(&self) -> Daemon {
        let child = Command::new(binary_path())
            .arg("--config")
            .arg(&self.config)
            .arg("daemon")
            .env_remove("MOTION_WOL_CONFIG")
            .env_remove("RUST_LOG")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start daemon");
        Daemon { child }
    }

    /// run with text output
    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with(&["--no-json"], args)
    }

    /// run with JSON output
    pub fn run_json(&self, args: &[&str]) -> Output {
        self.run_with(&["--json"], args)
    }

    fn run_with(&self, flags: &[&str], args: &[&str]) -> Output {
        Command::new(binary_path())
            .arg("--config")
            .arg(&self.config)
            .args(flags)
            .args(args)
            .env_remove("MOTION_WOL_CONFIG")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run motion-wol")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!("stdout is not JSON ({}): {}", e, stdout(output));
    })
}

/// a daemon child process, killed if the test leaves it running
pub struct Daemon {
    pub child: Child,
}

impl Daemon {
    /// wait for the process to exit on its own
    pub fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        wait_until(timeout, || matches!(self.child.try_wait(), Ok(Some(_))))
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            self.child.kill().ok();
            self.child.wait().ok();
        }
    }
}

/// poll `condition` every 50ms until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}
