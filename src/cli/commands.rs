use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;

use std::path::{Path, PathBuf};

use crate::conditions::{parse_rules, ParseError};
use crate::config::{self, Config};
use crate::daemon::{self, ipc, Overrides};
use crate::engine::Engine;
use crate::rules::{Rule, RuleRegistry};

use super::exit_codes;
use super::output::{self, CheckData, ErrorData, EvalData, JsonRpcError, OutputMode, RuleData};

#[derive(Parser)]
#[command(name = "motion-wol")]
#[command(about = "Wake hosts on the LAN when motion is detected and their rules allow it")]
#[command(version)]
pub struct Cli {
    /// Path to config file (overrides MOTION_WOL_CONFIG env var and default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon in the foreground
    Daemon {
        /// Named pipe to read motion events from (overrides config)
        #[arg(long)]
        fifo: Option<PathBuf>,

        /// Rules file (overrides config)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Don't monitor hosts with ping
        #[arg(long)]
        no_ping: bool,
    },

    /// Parse a rules file and print the rules it defines
    Check {
        /// Rules file (defaults to the one in the config)
        rules: Option<PathBuf>,
    },

    /// Show which hosts a motion event would wake, without waking them
    Eval {
        /// Rules file (defaults to the one in the config)
        rules: Option<PathBuf>,

        /// Evaluate at this time (RFC 3339) instead of now
        #[arg(long)]
        at: Option<String>,

        /// Seconds since the previous motion event (unset: no motion seen yet)
        #[arg(long)]
        idle: Option<u64>,
    },

    /// Enable all rules of the running daemon
    Enable,

    /// Disable all rules of the running daemon
    Disable,

    /// Show daemon status
    Status,

    /// Send a motion event to the running daemon
    Motion,

    /// Stop the running daemon
    Stop,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "ping.interval_secs")
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset configuration to defaults
    Reset,
    /// Show the default configuration
    Default,
    /// Verify configuration file and the rules it points at
    Verify,
}

pub fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet);

    match cli.command {
        Commands::Daemon {
            fifo,
            rules,
            no_ping,
        } => {
            let config = load_config(config_path, mode);
            daemon::run(
                &config,
                Overrides {
                    fifo,
                    rules,
                    no_ping,
                },
            )
        }

        Commands::Check { rules } => {
            let config = load_config(config_path, mode);
            let path = rules.unwrap_or_else(|| config.rules_path());
            let rules = read_rules(&path, mode);

            let data = CheckData {
                path: path.display().to_string(),
                rules: rules.iter().map(rule_data).collect(),
            };

            match mode {
                OutputMode::Json => output::print_json(&data),
                OutputMode::Quiet => {}
                OutputMode::Text => {
                    for rule in &data.rules {
                        match &rule.address {
                            Some(address) => print!("wake {} {}", rule.mac, address),
                            None => print!("wake {}", rule.mac),
                        }
                        println!(" (hold off {}s)", rule.hold_off);
                        println!("    {}", rule.when);
                    }
                    println!("✓ {} rule(s) in {}", data.rules.len(), data.path);
                }
            }
            Ok(())
        }

        Commands::Eval { rules, at, idle } => {
            let config = load_config(config_path, mode);
            let path = rules.unwrap_or_else(|| config.rules_path());

            let now: DateTime<FixedOffset> = match at {
                Some(at) => match DateTime::parse_from_rfc3339(&at) {
                    Ok(t) => t,
                    Err(e) => fail(
                        mode,
                        exit_codes::INVALID_ARGS,
                        &format!("invalid --at time '{}': {}", at, e),
                        None,
                    ),
                },
                None => Local::now().into(),
            };
            let previous = idle.map(|secs| previous_motion(now.timestamp(), secs));

            let mut registry = RuleRegistry::new();
            registry.extend(read_rules(&path, mode));
            let engine = Engine::new(registry);
            let wakes = engine.dry_run(&now, previous);

            let data = EvalData {
                at: now.to_rfc3339(),
                previous_motion: previous
                    .and_then(|p| DateTime::<Utc>::from_timestamp(p, 0))
                    .map(|p| p.with_timezone(now.offset()).to_rfc3339()),
                wake: wakes.iter().map(|w| w.host.to_string()).collect(),
            };

            match mode {
                OutputMode::Json => output::print_json(&data),
                OutputMode::Quiet => {}
                OutputMode::Text => {
                    if data.wake.is_empty() {
                        println!("no hosts would be woken at {}", data.at);
                    } else {
                        println!("at {} would wake:", data.at);
                        for host in &data.wake {
                            println!("  {}", host);
                        }
                    }
                }
            }
            Ok(())
        }

        Commands::Enable => control(config_path, mode, "enable"),
        Commands::Disable => control(config_path, mode, "disable"),
        Commands::Motion => control(config_path, mode, "motion"),
        Commands::Stop => control(config_path, mode, "stop"),

        Commands::Status => {
            let config = load_config(config_path, mode);
            if !ipc::is_daemon_running(&config.pid_path()) {
                match mode {
                    OutputMode::Json => output::print_json(&serde_json::json!({ "running": false })),
                    OutputMode::Quiet => {}
                    OutputMode::Text => println!("Daemon is not running"),
                }
                return Ok(());
            }
            control(config_path, mode, "status")
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = load_config(config_path, mode);
                let json =
                    serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
                println!("{}", json);
                Ok(())
            }
            ConfigCommands::Path => {
                let path = config::get_config_path_with_override(config_path);
                println!("{}", path.display());
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let mut config = load_config(config_path, mode);
                if let Err(e) = config::set_value(&mut config, &key, &value) {
                    fail(mode, exit_codes::INVALID_ARGS, &format!("{:#}", e), None);
                }
                config::save_with_override(&config, config_path)?;
                if !mode.is_quiet() {
                    println!("Set {} = {}", key, value);
                }
                Ok(())
            }
            ConfigCommands::Reset => {
                config::save_with_override(&Config::default(), config_path)?;
                if !mode.is_quiet() {
                    println!("Configuration reset to defaults");
                }
                Ok(())
            }
            ConfigCommands::Default => {
                let json = serde_json::to_string_pretty(&Config::default())
                    .context("Failed to serialize config")?;
                println!("{}", json);
                Ok(())
            }
            ConfigCommands::Verify => {
                let path = config::get_config_path_with_override(config_path);
                let errors = match config::verify(&path) {
                    Ok(errors) => errors,
                    Err(e) => fail(mode, exit_codes::CONFIG_ERROR, &format!("{:#}", e), None),
                };

                if errors.is_empty() {
                    if mode.is_json() {
                        output::print_json(&serde_json::json!({
                            "valid": true,
                            "path": path.display().to_string(),
                        }));
                    } else if !mode.is_quiet() {
                        println!("✓ Configuration is valid: {}", path.display());
                    }
                    return Ok(());
                }

                if mode.is_json() {
                    output::print_json(&serde_json::json!({
                        "valid": false,
                        "path": path.display().to_string(),
                        "errors": errors,
                    }));
                } else {
                    println!(
                        "✗ Configuration has {} error(s): {}",
                        errors.len(),
                        path.display()
                    );
                    println!();
                    for error in &errors {
                        println!("  - {}", error);
                    }
                }
                std::process::exit(exit_codes::CONFIG_ERROR);
            }
        },
    }
}

/// print an error in the current output mode and exit
fn fail(mode: OutputMode, code: i32, message: &str, data: Option<ErrorData>) -> ! {
    if mode.is_json() {
        let mut error = JsonRpcError::new(code, message);
        if let Some(data) = data {
            error = error.with_data(data);
        }
        output::print_json_error(&error);
    } else {
        eprintln!("Error: {}", message);
    }
    std::process::exit(code);
}

fn load_config(config_path: Option<&Path>, mode: OutputMode) -> Config {
    match config::load_with_override(config_path) {
        Ok(config) => config,
        Err(e) => fail(mode, exit_codes::CONFIG_ERROR, &format!("{:#}", e), None),
    }
}

fn read_rules(path: &Path, mode: OutputMode) -> Vec<Rule> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => fail(
            mode,
            exit_codes::ERROR,
            &format!("Failed to read rules file {}: {}", path.display(), e),
            None,
        ),
    };

    match parse_rules(&text) {
        Ok(rules) => rules,
        Err(e) => fail(
            mode,
            exit_codes::RULES_ERROR,
            &format!("{}: {}", path.display(), e),
            Some(parse_error_data(&e)),
        ),
    }
}

/// `idle` seconds before `now`, clamped instead of wrapping
fn previous_motion(now: i64, idle: u64) -> i64 {
    now.saturating_sub(i64::try_from(idle).unwrap_or(i64::MAX))
}

fn parse_error_data(error: &ParseError) -> ErrorData {
    let details = match error {
        ParseError::Configuration { source, .. } => Some(source.to_string()),
        _ => None,
    };
    ErrorData {
        line: Some(error.line()),
        details,
    }
}

fn rule_data(rule: &Rule) -> RuleData {
    RuleData {
        mac: rule.host().mac.to_string(),
        address: rule.host().address.map(|a| a.to_string()),
        hold_off: rule.hold_off_secs(),
        when: rule.when().to_string(),
    }
}

/// send a control request to the running daemon and print its reply
fn control(config_path: Option<&Path>, mode: OutputMode, method: &str) -> Result<()> {
    let config = load_config(config_path, mode);

    if !ipc::is_daemon_running(&config.pid_path()) {
        fail(
            mode,
            exit_codes::DAEMON_NOT_RUNNING,
            "Daemon is not running. Start with: motion-wol daemon",
            None,
        );
    }

    let response = ipc::send_request(&config.socket_path(), method)?;
    if let Some(error) = response.error {
        fail(mode, exit_codes::ERROR, &error.message, None);
    }
    let result = response
        .result
        .ok_or_else(|| anyhow!("daemon sent an empty reply"))?;

    match mode {
        OutputMode::Json => output::print_json(&result),
        OutputMode::Quiet => {}
        OutputMode::Text => print_control_result(method, &result),
    }
    Ok(())
}

fn print_control_result(method: &str, result: &Value) {
    match method {
        "enable" | "disable" => {
            println!("{} rule(s) enabled", result["enabled"]);
        }
        "motion" => {
            let woken = result["woken"].as_array().map(Vec::len).unwrap_or(0);
            println!("motion event sent, {} host(s) woken", woken);
        }
        "stop" => println!("Daemon stopping"),
        "status" => {
            println!("Daemon running (pid {})", result["pid"]);
            println!("Rules: {} ({} enabled)", result["rules"], result["enabled"]);
            println!("Last motion: {}", or_never(&result["last_motion"]));
            if let Some(hosts) = result["hosts"].as_array() {
                println!("Hosts:");
                for host in hosts {
                    println!(
                        "  {} {}  last wake: {}  last ping: {}",
                        host["mac"].as_str().unwrap_or("?"),
                        host["address"].as_str().unwrap_or("-"),
                        or_never(&host["last_wake"]),
                        or_never(&host["last_ping"]),
                    );
                }
            }
        }
        _ => println!("{}", result),
    }
}

fn or_never(value: &Value) -> String {
    value
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| "never".to_string())
}
