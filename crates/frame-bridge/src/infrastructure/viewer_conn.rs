//! TCP link to the viewer's event bus.
//!
//! The viewer exposes its bus on a TCP socket.  Both directions carry
//! newline-delimited JSON frames:
//!
//! ```text
//! {"topic":"VIEWER_INITIALIZED","payload":{"config_id":42}}\n
//! ```
//!
//! Frames read from the viewer are published on the [`LocalEventBus`], where
//! the bridge sessions pick them up.  Publications on the
//! [`VIEWER_COMMAND_TOPICS`] made by any session are written back to the
//! viewer.  The link joins the bus without echo, so frames it republishes
//! are never written back.  When the viewer goes away the bus forgets its
//! retained viewer state.
//!
//! TCP is a stream protocol: a single read may carry part of a frame or
//! several frames.  `BufReader::lines` handles the reassembly.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use frame_core::topics::VIEWER_COMMAND_TOPICS;

use crate::application::EventBus;
use crate::infrastructure::event_bus::LocalEventBus;

/// Pause between attempts to reach the viewer.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// One bus message on the viewer link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusFrame {
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

impl BusFrame {
    /// Parses one line.  Blank lines yield `Ok(None)`.
    pub fn decode(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }

    /// Serializes the frame followed by `\n`.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Keeps a link to the viewer open until `running` is cleared, reconnecting
/// after [`RECONNECT_DELAY`] whenever the viewer is unreachable or drops the
/// connection.
pub async fn run_viewer_link(addr: SocketAddr, bus: LocalEventBus, running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        match connect(addr).await {
            Ok(stream) => {
                info!("viewer link connected to {addr}");
                let (read_half, write_half) = stream.into_split();
                match serve_viewer_stream(read_half, write_half, &bus).await {
                    Ok(()) => info!("viewer at {addr} closed the link"),
                    Err(e) => warn!("viewer link to {addr} failed: {e:#}"),
                }
            }
            Err(e) => debug!("{e:#}"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Opens a TCP connection to the viewer's bus endpoint.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(addr: SocketAddr) -> anyhow::Result<TcpStream> {
    TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to viewer bus at {addr}"))
}

/// Pumps frames between one viewer connection and the local bus until
/// either side closes.
///
/// # Errors
///
/// Returns an error if reading from or writing to the viewer fails.
/// Undecodable lines are logged and skipped.
pub async fn serve_viewer_stream<R, W>(
    read_half: R,
    write_half: W,
    bus: &LocalEventBus,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = pump_frames(read_half, write_half, bus).await;
    bus.clear_retained();
    result
}

async fn pump_frames<R, W>(
    read_half: R,
    mut write_half: W,
    bus: &LocalEventBus,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (handle, mut outbound) = bus.join_without_echo();
    for topic in VIEWER_COMMAND_TOPICS {
        handle.subscribe(topic);
    }
    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read from viewer failed")? else {
                    return Ok(());
                };
                match BusFrame::decode(&line) {
                    Ok(Some(frame)) => {
                        debug!("viewer → bus: {}", frame.topic);
                        handle.publish(&frame.topic, frame.payload);
                    }
                    Ok(None) => {}
                    Err(e) => warn!("skipping undecodable viewer frame: {e}"),
                }
            }
            Some(event) = outbound.recv() => {
                let frame = BusFrame { topic: event.topic, payload: event.payload };
                let text = frame.encode().context("encode viewer frame")?;
                write_half
                    .write_all(text.as_bytes())
                    .await
                    .context("write to viewer failed")?;
                debug!("bus → viewer: {}", frame.topic);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
