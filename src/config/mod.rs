mod schema;

pub use schema::{Config, LogSettings, PingSettings, WakeMethod, WakeSettings};

use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::conditions::parse_rules;

const CONFIG_ENV_VAR: &str = "MOTION_WOL_CONFIG";

pub fn get_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".motion-wol")
        .join("config.json")
}

/// config path from `--config` if given, else env var or default location
pub fn get_config_path_with_override(override_path: Option<&Path>) -> PathBuf {
    match override_path {
        Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string()),
        None => get_config_path(),
    }
}

/// read a config file; a missing file means defaults
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // json5 so that hand-edited files may carry comments and trailing commas
    let config: Config = json5::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

pub fn load_with_override(override_path: Option<&Path>) -> Result<Config> {
    load_from(&get_config_path_with_override(override_path))
}

pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

pub fn save_with_override(config: &Config, override_path: Option<&Path>) -> Result<()> {
    save_to(config, &get_config_path_with_override(override_path))
}

/// Verify configuration file and return a list of errors
///
/// besides the settings themselves this parses the rules file the config
/// points at, so a broken rule shows up before the daemon is started.
pub fn verify(path: &Path) -> Result<Vec<String>> {
    let mut errors = Vec::new();

    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = match json5::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            return Err(anyhow!("invalid JSON: {}", e));
        }
    };

    if config.ping.interval_secs == 0 {
        errors.push("ping.interval_secs: must be at least 1".to_string());
    }

    if config.wake.command.trim().is_empty() {
        errors.push("wake.command: must not be empty".to_string());
    }

    if let Err(e) = config.wake.broadcast.parse::<SocketAddr>() {
        errors.push(format!(
            "wake.broadcast: invalid address '{}': {}",
            config.wake.broadcast, e
        ));
    }

    if let Err(e) = tracing_subscriber::EnvFilter::try_new(&config.log.level) {
        errors.push(format!("log.level: invalid filter '{}': {}", config.log.level, e));
    }

    if config.fifo_path() == config.socket_path() {
        errors.push("fifo and socket must be different paths".to_string());
    }

    let rules_path = config.rules_path();
    match fs::read_to_string(&rules_path) {
        Ok(text) => {
            if let Err(e) = parse_rules(&text) {
                errors.push(format!("rules: {}: {}", rules_path.display(), e));
            }
        }
        Err(e) => {
            errors.push(format!("rules: cannot read {}: {}", rules_path.display(), e));
        }
    }

    Ok(errors)
}

pub fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["rules"] => {
            config.rules = value.to_string();
        }
        ["fifo"] => {
            config.fifo = value.to_string();
        }
        ["socket"] => {
            config.socket = value.to_string();
        }
        ["ping", "enabled"] => {
            config.ping.enabled = parse_bool(value)?;
        }
        ["ping", "interval_secs"] => {
            config.ping.interval_secs = value
                .parse()
                .with_context(|| format!("Invalid number: {}", value))?;
        }
        ["wake", "method"] => {
            config.wake.method = match value.to_lowercase().as_str() {
                "packet" => WakeMethod::Packet,
                "command" => WakeMethod::Command,
                _ => {
                    return Err(anyhow!(
                        "Invalid wake method: {}. Use packet or command",
                        value
                    ))
                }
            };
        }
        ["wake", "command"] => {
            config.wake.command = value.to_string();
        }
        ["wake", "broadcast"] => {
            value
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid address: {}", value))?;
            config.wake.broadcast = value.to_string();
        }
        ["log", "level"] => {
            config.log.level = value.to_string();
        }
        _ => {
            return Err(anyhow!(
                "Unknown config key: {}. Valid keys: rules, fifo, socket, ping.enabled, ping.interval_secs, wake.method, wake.command, wake.broadcast, log.level",
                key
            ));
        }
    }

    Ok(())
}

/// read and parse a rules file
pub fn read_rules(path: &Path) -> Result<Vec<crate::rules::Rule>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
    parse_rules(&text).with_context(|| format!("Invalid rules file: {}", path.display()))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "Invalid boolean value: {}. Use true/false, yes/no, 1/0, or on/off",
            value
        )),
    }
}
