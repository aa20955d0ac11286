//! Serial device sink
//!
//! The controller shows up as a USB serial node. The node is opened without
//! becoming the daemon's controlling terminal and switched to raw 8N1 at
//! [`BAUD_RATE`] before the first line is written.

use async_trait::async_trait;
use nix::fcntl::OFlag;
use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg};
use std::io::IsTerminal;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{LineSink, LinkError, LinkResult};

/// Line speed of the unit controller
pub const BAUD_RATE: BaudRate = BaudRate::B115200;

/// Flags for the first open of the device node. `O_NONBLOCK` keeps the open
/// from waiting on carrier detect before `CLOCAL` is set.
pub fn open_flags() -> OFlag {
    OFlag::O_NOCTTY | OFlag::O_NONBLOCK
}

/// Device name prefixes probed when no device is configured
pub const SERIAL_PREFIXES: &[&str] = &["ttyUSB", "ttyACM"];

struct OpenDevice {
    path: PathBuf,
    file: File,
}

/// Sink writing to a serial device node.
///
/// The device is opened lazily on the first write and reopened after a
/// failure, so a controller that is unplugged and plugged back in recovers
/// without restarting the daemon.
pub struct DeviceSink {
    configured: Option<PathBuf>,
    search_dir: PathBuf,
    device: Mutex<Option<OpenDevice>>,
    connected: AtomicBool,
}

impl DeviceSink {
    /// Sink for `path`, or for the first serial node found under `/dev`
    pub fn new(path: Option<PathBuf>) -> Self {
        Self::with_search_dir(path, "/dev")
    }

    /// Like [`DeviceSink::new`] but probing `dir` instead of `/dev`
    pub fn with_search_dir(path: Option<PathBuf>, dir: impl AsRef<Path>) -> Self {
        Self {
            configured: path,
            search_dir: dir.as_ref().to_path_buf(),
            device: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    async fn open(&self) -> LinkResult<OpenDevice> {
        let path = match &self.configured {
            Some(path) => path.clone(),
            None => detect_device(&self.search_dir).await.ok_or_else(|| {
                LinkError::Unavailable(format!(
                    "no serial device found in {}",
                    self.search_dir.display()
                ))
            })?,
        };

        let target = path.clone();
        let file = tokio::task::spawn_blocking(move || open_serial(&target))
            .await
            .map_err(|e| LinkError::Unavailable(format!("{}: {}", path.display(), e)))?
            .map_err(|e| LinkError::Unavailable(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), baud = ?BAUD_RATE, "Link device opened");
        Ok(OpenDevice {
            path,
            file: File::from_std(file),
        })
    }
}

/// Open `path` for writing and put the line in raw mode.
///
/// Once the line ignores modem control it is opened again in blocking mode
/// for the writer. Nodes that are not terminals (a FIFO or plain file
/// standing in for the controller) are used as they are.
fn open_serial(path: &Path) -> std::io::Result<std::fs::File> {
    let first = open_with(path, open_flags())?;
    if !first.is_terminal() {
        return Ok(first);
    }

    configure_line(&first)?;
    open_with(path, OFlag::O_NOCTTY)
}

fn open_with(path: &Path, flags: OFlag) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .custom_flags(flags.bits())
        .open(path)
}

/// Raw 8N1 at [`BAUD_RATE`], ignoring modem control lines
fn configure_line(file: &std::fs::File) -> std::io::Result<()> {
    let mut tio = termios::tcgetattr(file)?;
    termios::cfmakeraw(&mut tio);
    termios::cfsetspeed(&mut tio, BAUD_RATE)?;
    tio.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
    tio.control_flags &= !(ControlFlags::CSTOPB | ControlFlags::PARENB | ControlFlags::CRTSCTS);
    termios::tcsetattr(file, SetArg::TCSANOW, &tio)?;
    Ok(())
}

#[async_trait]
impl LineSink for DeviceSink {
    async fn write_line(&self, line: &str) -> LinkResult<()> {
        let mut guard = self.device.lock().await;

        if guard.is_none() {
            match self.open().await {
                Ok(device) => *guard = Some(device),
                Err(e) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        let Some(device) = guard.as_mut() else {
            return Err(LinkError::Unavailable("device not open".into()));
        };

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let result = async {
            device.file.write_all(buf.as_bytes()).await?;
            device.file.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                let detail = format!("{}: {}", device.path.display(), e);
                debug!(error = %detail, "Link write failed, closing device");
                *guard = None;
                self.connected.store(false, Ordering::SeqCst);
                Err(LinkError::Unavailable(detail))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn describe(&self) -> String {
        match &self.configured {
            Some(path) => path.display().to_string(),
            None => format!("auto ({})", self.search_dir.display()),
        }
    }
}

/// First serial node under `dir`, in name order
pub async fn detect_device(dir: &Path) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut found = Vec::new();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if SERIAL_PREFIXES.iter().any(|p| name.starts_with(p)) {
            found.push(entry.path());
        }
    }

    found.sort();
    found.into_iter().next()
}
