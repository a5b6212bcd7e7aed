use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_RULES_PATH: &str = "~/.motion-wol/rules";
pub const DEFAULT_FIFO_PATH: &str = "/tmp/motion-wol.fifo";
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/motion-wol.sock";
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_WAKE_COMMAND: &str = "wakeonlan";
pub const DEFAULT_BROADCAST: &str = "255.255.255.255:9";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// rules file, `~` is expanded
    #[serde(default = "default_rules")]
    pub rules: String,
    /// named pipe motion events are written to
    #[serde(default = "default_fifo")]
    pub fifo: String,
    /// control socket
    #[serde(default = "default_socket")]
    pub socket: String,
    #[serde(default)]
    pub ping: PingSettings,
    #[serde(default)]
    pub wake: WakeSettings,
    #[serde(default)]
    pub log: LogSettings,
}

fn default_rules() -> String {
    DEFAULT_RULES_PATH.to_string()
}

fn default_fifo() -> String {
    DEFAULT_FIFO_PATH.to_string()
}

fn default_socket() -> String {
    DEFAULT_SOCKET_PATH.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            fifo: default_fifo(),
            socket: default_socket(),
            ping: PingSettings::default(),
            wake: WakeSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl Config {
    pub fn rules_path(&self) -> PathBuf {
        expand(&self.rules)
    }

    pub fn fifo_path(&self) -> PathBuf {
        expand(&self.fifo)
    }

    pub fn socket_path(&self) -> PathBuf {
        expand(&self.socket)
    }

    /// pid file, next to the control socket
    pub fn pid_path(&self) -> PathBuf {
        self.socket_path().with_extension("pid")
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// liveness monitoring of hosts that have an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ping_interval")]
    pub interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_ping_interval() -> u64 {
    DEFAULT_PING_INTERVAL_SECS
}

impl Default for PingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_PING_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeMethod {
    /// send the magic packet ourselves
    #[default]
    Packet,
    /// run an external command with the mac address as its last argument
    Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeSettings {
    #[serde(default)]
    pub method: WakeMethod,
    #[serde(default = "default_wake_command")]
    pub command: String,
    /// destination of magic packets, `address:port`
    #[serde(default = "default_broadcast")]
    pub broadcast: String,
}

fn default_wake_command() -> String {
    DEFAULT_WAKE_COMMAND.to_string()
}

fn default_broadcast() -> String {
    DEFAULT_BROADCAST.to_string()
}

impl Default for WakeSettings {
    fn default() -> Self {
        Self {
            method: WakeMethod::default(),
            command: default_wake_command(),
            broadcast: default_broadcast(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
