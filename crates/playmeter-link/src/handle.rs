//! Non-blocking front end to the link writer task

use playmeter_api::UnitView;
use playmeter_util::UnitId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::protocol::{encode_relay, encode_sync_frame};
use crate::{LineSink, LinkError};

/// Connectivity transitions reported by the writer task
#[derive(Debug, Clone)]
pub enum LinkStatus {
    /// A write failed after the link had been working (or never worked)
    Lost(LinkError),
    /// A write succeeded after a failure
    Restored,
}

/// Cheap-to-clone handle to the link writer.
///
/// Status frames supersede each other: only the latest pending frame is
/// written. Relay commands are queued and written in order, ahead of any
/// pending frame.
#[derive(Clone)]
pub struct LinkHandle {
    frame_tx: Arc<watch::Sender<Option<String>>>,
    relay_tx: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
}

impl LinkHandle {
    /// Spawn the writer task for `sink`.
    ///
    /// Returns the handle and the receiver for connectivity transitions. The
    /// task ends once every handle has been dropped.
    pub fn spawn(sink: Arc<dyn LineSink>) -> (Self, mpsc::UnboundedReceiver<LinkStatus>) {
        let (frame_tx, frame_rx) = watch::channel(None);
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        info!(sink = %sink.describe(), "Link writer starting");

        tokio::spawn(run_writer(
            sink,
            frame_rx,
            relay_rx,
            status_tx,
            connected.clone(),
        ));

        (
            Self {
                frame_tx: Arc::new(frame_tx),
                relay_tx,
                connected,
            },
            status_rx,
        )
    }

    /// Replace the pending status frame
    pub fn sync(&self, units: &[UnitView]) {
        self.frame_tx.send_replace(Some(encode_sync_frame(units)));
    }

    /// Queue a relay command
    pub fn relay(&self, unit: UnitId, on: bool) {
        if self.relay_tx.send(encode_relay(unit, on)).is_err() {
            warn!(unit_id = %unit, on, "Link writer gone, relay command dropped");
        }
    }

    /// Whether the last write succeeded
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn run_writer(
    sink: Arc<dyn LineSink>,
    mut frame_rx: watch::Receiver<Option<String>>,
    mut relay_rx: mpsc::UnboundedReceiver<String>,
    status_tx: mpsc::UnboundedSender<LinkStatus>,
    connected: Arc<AtomicBool>,
) {
    // Unknown until the first write; the first failure is still reported
    let mut healthy: Option<bool> = None;

    loop {
        let line = tokio::select! {
            biased;

            command = relay_rx.recv() => match command {
                Some(line) => line,
                None => break,
            },

            changed = frame_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                match frame_rx.borrow_and_update().clone() {
                    Some(frame) => frame,
                    None => continue,
                }
            }
        };

        match sink.write_line(&line).await {
            Ok(()) => {
                connected.store(true, Ordering::SeqCst);
                if healthy == Some(false) {
                    info!("Link restored");
                    let _ = status_tx.send(LinkStatus::Restored);
                }
                healthy = Some(true);
            }
            Err(e) => {
                connected.store(false, Ordering::SeqCst);
                if healthy != Some(false) {
                    let _ = status_tx.send(LinkStatus::Lost(e));
                } else {
                    debug!(error = %e, "Link still unavailable");
                }
                healthy = Some(false);
            }
        }
    }

    debug!("Link writer stopped");
}
