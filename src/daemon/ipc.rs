//! control socket: line-delimited JSON-RPC 2.0 over a unix socket
//!
//! methods: `enable`, `disable`, `status`, `motion`, `stop`

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::wake::{spawn_wakes, Waker};
use super::{lock, SharedEngine};
use crate::engine::Engine;
use crate::rules::WakeRequest;

const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;

pub const METHODS: [&str; 5] = ["enable", "disable", "status", "motion", "stop"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            method: method.into(),
            id: Some(json!(1)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
}

impl Response {
    pub fn ok(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(ResponseError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

/// what the server must do after replying
#[derive(Debug)]
pub enum Outcome {
    Reply,
    Wake(Vec<WakeRequest>),
    Stop,
}

/// apply one control request to the engine
pub fn dispatch<Tz: TimeZone>(
    engine: &mut Engine,
    request: &Request,
    now: &DateTime<Tz>,
) -> (Response, Outcome) {
    let id = request.id.clone();

    match request.method.as_str() {
        "enable" => {
            engine.enable_all();
            info!("rules enabled");
            let enabled = engine.registry().enabled_count();
            (Response::ok(id, json!({ "enabled": enabled })), Outcome::Reply)
        }
        "disable" => {
            engine.disable_all();
            info!("rules disabled");
            let enabled = engine.registry().enabled_count();
            (Response::ok(id, json!({ "enabled": enabled })), Outcome::Reply)
        }
        "status" => {
            let mut status = serde_json::to_value(engine.status()).unwrap_or_default();
            status["pid"] = json!(std::process::id());
            (Response::ok(id, status), Outcome::Reply)
        }
        "motion" => {
            let requests = engine.on_motion(now);
            info!(wakes = requests.len(), "motion event from control socket");
            let woken: Vec<String> = requests.iter().map(|r| r.mac().to_string()).collect();
            (Response::ok(id, json!({ "woken": woken })), Outcome::Wake(requests))
        }
        "stop" => (Response::ok(id, json!({ "stopping": true })), Outcome::Stop),
        other => (
            Response::error(
                id,
                METHOD_NOT_FOUND,
                format!("unknown method '{}', expected one of {}", other, METHODS.join(", ")),
            ),
            Outcome::Reply,
        ),
    }
}

/// accept control connections until the listener fails
pub async fn serve(
    listener: UnixListener,
    engine: SharedEngine,
    waker: Arc<Waker>,
    stop: mpsc::Sender<()>,
) -> Result<()> {
    loop {
        let (stream, _) = listener
            .accept()
            .await
            .context("Failed to accept control connection")?;

        let engine = Arc::clone(&engine);
        let waker = Arc::clone(&waker);
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, engine, waker, stop).await {
                warn!("control connection failed: {:#}", e);
            }
        });
    }
}

async fn handle_connection(
    stream: UnixStream,
    engine: SharedEngine,
    waker: Arc<Waker>,
    stop: mpsc::Sender<()>,
) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = tokio::io::BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, outcome) = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                debug!(method = %request.method, "control request");
                let mut engine = lock(&engine);
                dispatch(&mut engine, &request, &Local::now())
            }
            Err(e) => (
                Response::error(None, PARSE_ERROR, format!("invalid request: {}", e)),
                Outcome::Reply,
            ),
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        write.write_all(out.as_bytes()).await?;
        write.flush().await?;

        match outcome {
            Outcome::Reply => {}
            Outcome::Wake(requests) => spawn_wakes(&waker, requests),
            Outcome::Stop => {
                info!("stop requested over control socket");
                let _ = stop.try_send(());
            }
        }
    }

    Ok(())
}

/// Send a request to the daemon and get a response
pub fn send_request(socket_path: &Path, method: &str) -> Result<Response> {
    let mut stream = std::os::unix::net::UnixStream::connect(socket_path)
        .with_context(|| format!("Failed to connect to daemon at {}", socket_path.display()))?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;

    let request = serde_json::to_string(&Request::new(method))?;
    stream.write_all(request.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let mut reader = BufReader::new(&stream);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        bail!("daemon closed the connection without replying");
    }

    serde_json::from_str(&line).map_err(|e| anyhow!("Invalid response from daemon: {}", e))
}

fn read_pid(pid_path: &Path) -> Option<i32> {
    std::fs::read_to_string(pid_path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Check if daemon is running by checking PID file
pub fn is_daemon_running(pid_path: &Path) -> bool {
    match read_pid(pid_path) {
        // signal 0 only checks that the process exists
        Some(pid) if pid > 0 => unsafe { libc::kill(pid, 0) == 0 },
        _ => false,
    }
}

pub fn write_pid_file(pid_path: &Path) -> Result<()> {
    let pid = std::process::id();
    std::fs::write(pid_path, pid.to_string())
        .with_context(|| format!("Failed to write pid file {}", pid_path.display()))?;
    Ok(())
}

pub fn remove_pid_file(pid_path: &Path) -> Result<()> {
    if pid_path.exists() {
        std::fs::remove_file(pid_path)?;
    }
    Ok(())
}
