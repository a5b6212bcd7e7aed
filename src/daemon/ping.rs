//! liveness monitor: one long-running `ping` per host with an address

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{lock, SharedEngine};
use crate::conditions::Host;

/// whether a line of ping output reports an echo reply
pub fn is_ping_reply(line: &str) -> bool {
    line.contains(" bytes from ")
}

/// record a ping log entry for every reply from `host`
pub async fn monitor(host: Arc<Host>, interval_secs: u64, engine: SharedEngine) -> Result<()> {
    let Some(address) = host.address else {
        return Ok(());
    };

    let mut child = Command::new("ping")
        .arg("-i")
        .arg(interval_secs.to_string())
        .arg(address.to_string())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start ping for {}", address))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("ping for {} has no stdout", address))?;
    let mut lines = BufReader::new(stdout).lines();

    while let Some(line) = lines.next_line().await? {
        if is_ping_reply(&line) {
            debug!(%address, "ping reply");
            lock(&engine).record_ping(&host, Utc::now().timestamp());
        }
    }

    warn!(%address, "ping exited");
    Ok(())
}
