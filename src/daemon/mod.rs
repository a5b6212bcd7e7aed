pub mod fifo;
pub mod ipc;
pub mod ping;
pub mod wake;

use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Context, Result};
use chrono::Local;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{self, Config};
use crate::engine::Engine;
use crate::rules::RuleRegistry;

use wake::{spawn_wakes, Waker};

pub type SharedEngine = Arc<Mutex<Engine>>;

/// command line overrides of config settings
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub fifo: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub no_ping: bool,
}

struct Paths {
    rules: PathBuf,
    fifo: PathBuf,
    socket: PathBuf,
    pid: PathBuf,
}

#[derive(Default)]
struct Owned {
    fifo: bool,
    socket: bool,
    pid: bool,
}

pub fn lock(engine: &SharedEngine) -> MutexGuard<'_, Engine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// one motion event: evaluate under the lock, transmit after releasing it
pub fn handle_motion(engine: &SharedEngine, waker: &Arc<Waker>) {
    let now = Local::now();
    let requests = lock(engine).on_motion(&now);
    info!(at = %now.format("%Y-%m-%d %H:%M:%S"), wakes = requests.len(), "motion event");
    spawn_wakes(waker, requests);
}

/// run the daemon in the foreground until stopped
pub fn run(config: &Config, overrides: Overrides) -> Result<()> {
    let paths = Paths {
        rules: overrides.rules.unwrap_or_else(|| config.rules_path()),
        fifo: overrides.fifo.unwrap_or_else(|| config.fifo_path()),
        socket: config.socket_path(),
        pid: config.pid_path(),
    };

    if ipc::is_daemon_running(&paths.pid) {
        bail!("Daemon is already running (pid file {})", paths.pid.display());
    }

    let rules = config::read_rules(&paths.rules)?;

    let mut registry = RuleRegistry::new();
    registry.extend(rules);
    info!(rules = registry.len(), path = %paths.rules.display(), "loaded rules");
    for rule in registry.iter() {
        info!(host = %rule.host(), hold_off = rule.hold_off_secs(), "rule {}", rule.when());
    }

    let waker = Arc::new(Waker::from_settings(&config.wake)?);
    let ping_interval =
        (config.ping.enabled && !overrides.no_ping).then_some(config.ping.interval_secs);
    let engine: SharedEngine = Arc::new(Mutex::new(Engine::new(registry)));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let mut owned = Owned::default();
    let result = runtime.block_on(serve(&paths, &mut owned, engine, waker, ping_interval));
    drop(runtime);

    cleanup(&paths, &owned);
    result
}

async fn serve(
    paths: &Paths,
    owned: &mut Owned,
    engine: SharedEngine,
    waker: Arc<Waker>,
    ping_interval: Option<u64>,
) -> Result<()> {
    info!(path = %paths.fifo.display(), "creating motion fifo");
    fifo::create(&paths.fifo)?;
    owned.fifo = true;

    ipc::write_pid_file(&paths.pid)?;
    owned.pid = true;

    remove_stale_socket(&paths.socket)?;
    let listener = UnixListener::bind(&paths.socket)
        .with_context(|| format!("Failed to bind control socket {}", paths.socket.display()))?;
    owned.socket = true;
    info!(path = %paths.socket.display(), "control socket listening");

    if let Some(interval) = ping_interval {
        let hosts = lock(&engine).registry().hosts();
        for host in hosts.into_iter().filter(|h| h.address.is_some()) {
            info!(host = %host, interval, "monitoring host");
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                if let Err(e) = ping::monitor(Arc::clone(&host), interval, engine).await {
                    warn!(host = %host, "ping monitor failed: {:#}", e);
                }
            });
        }
    }

    let (stop_tx, mut stop_rx) = mpsc::channel(1);
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = fifo::watch(&paths.fifo, Arc::clone(&engine), Arc::clone(&waker)) => {
            result?;
        }
        result = ipc::serve(listener, Arc::clone(&engine), Arc::clone(&waker), stop_tx) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
        _ = sigterm.recv() => info!("terminated, shutting down"),
        _ = stop_rx.recv() => info!("stopping"),
    }

    Ok(())
}

/// a socket left behind by a crashed daemon would make bind fail
fn remove_stale_socket(path: &Path) -> Result<()> {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    if !meta.file_type().is_socket() {
        bail!("{} exists and is not a socket", path.display());
    }
    fs::remove_file(path)
        .with_context(|| format!("Failed to remove stale socket {}", path.display()))
}

/// only paths this daemon created or verified are removed on exit
fn cleanup(paths: &Paths, owned: &Owned) {
    info!("cleaning up");
    if owned.fifo {
        remove_if_exists(&paths.fifo);
    }
    if owned.socket {
        remove_if_exists(&paths.socket);
    }
    if owned.pid {
        if let Err(e) = ipc::remove_pid_file(&paths.pid) {
            error!("failed to remove pid file {}: {:#}", paths.pid.display(), e);
        }
    }
}

fn remove_if_exists(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            error!("failed to remove {}: {}", path.display(), e);
        }
    }
}
