//! named pipe motion source: every read is one motion event

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tracing::debug;

use super::wake::Waker;
use super::{handle_motion, SharedEngine};

/// create the fifo, reusing one that already exists at `path`
pub fn create(path: &Path) -> Result<()> {
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.file_type().is_fifo() {
            return Ok(());
        }
        bail!("{} exists and is not a named pipe", path.display());
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| anyhow!("fifo path contains a NUL byte: {}", path.display()))?;

    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o622) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("Failed to create fifo {}", path.display()));
    }
    Ok(())
}

/// read motion events until the pipe fails
pub async fn watch(path: &Path, engine: SharedEngine, waker: Arc<Waker>) -> Result<()> {
    // opened read-write so the pipe stays open while no writer is attached
    let mut receiver = pipe::OpenOptions::new()
        .read_write(true)
        .open_receiver(path)
        .with_context(|| format!("Failed to open fifo {}", path.display()))?;

    let mut buf = [0u8; 1024];
    loop {
        let n = receiver
            .read(&mut buf)
            .await
            .with_context(|| format!("Failed to read fifo {}", path.display()))?;
        if n == 0 {
            bail!("fifo {} was closed", path.display());
        }
        debug!(bytes = n, "fifo read");
        handle_motion(&engine, &waker);
    }
}
