//! wake-on-lan transmission

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::net::UdpSocket;
use tokio::process::Command;
use tracing::{info, warn};

use crate::conditions::{Host, MacAddress};
use crate::config::{WakeMethod, WakeSettings};
use crate::rules::WakeRequest;

const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// six 0xff bytes followed by the mac address repeated sixteen times
pub fn magic_packet(mac: MacAddress) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xffu8; MAGIC_PACKET_LEN];
    let octets = mac.octets();
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&octets);
    }
    packet
}

#[derive(Debug, Clone)]
pub struct Waker {
    method: WakeMethod,
    program: String,
    args: Vec<String>,
    broadcast: SocketAddr,
}

impl Waker {
    pub fn from_settings(settings: &WakeSettings) -> Result<Self> {
        let broadcast = settings
            .broadcast
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid wake.broadcast address: {}", settings.broadcast))?;

        let mut words = settings.command.split_whitespace().map(String::from);
        let program = words
            .next()
            .ok_or_else(|| anyhow!("wake.command must not be empty"))?;

        Ok(Self {
            method: settings.method,
            program,
            args: words.collect(),
            broadcast,
        })
    }

    pub async fn wake(&self, host: &Host) -> Result<()> {
        match self.method {
            WakeMethod::Packet => self.send_packet(host.mac).await,
            WakeMethod::Command => self.run_command(host.mac).await,
        }
    }

    async fn send_packet(&self, mac: MacAddress) -> Result<()> {
        let bind: SocketAddr = if self.broadcast.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).await.context("Failed to bind UDP socket")?;
        socket.set_broadcast(true)?;
        socket
            .send_to(&magic_packet(mac), self.broadcast)
            .await
            .with_context(|| format!("Failed to send magic packet to {}", self.broadcast))?;
        Ok(())
    }

    async fn run_command(&self, mac: MacAddress) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(mac.to_string())
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// send every request in the background; failures are logged, never retried
pub fn spawn_wakes(waker: &Arc<Waker>, requests: Vec<WakeRequest>) {
    for request in requests {
        let waker = Arc::clone(waker);
        tokio::spawn(async move {
            info!(host = %request.host, "waking host");
            if let Err(e) = waker.wake(&request.host).await {
                warn!(host = %request.host, "wake failed: {:#}", e);
            }
        });
    }
}
