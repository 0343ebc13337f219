//! Host-facing WebSocket server: accept loop and per-session driver.
//!
//! Each accepted WebSocket connection is one host window.  Its text frames
//! carry [`Envelope`]s in both directions.  A connection gets its own
//! [`FrameBridge`], joined to the shared [`LocalEventBus`], and its own Tokio
//! task that drives the bridge:
//!
//! ```text
//!            ┌──────────── select! ─────────────┐
//! ws frame ─►│ on_host_message                   │
//! bus event ►│ on_bus_event                      │──► ws writer task
//! deadline ─►│ on_deadline                       │
//!            └───────────────────────────────────┘
//! ```
//!
//! The connection plays both window roles: the embedding parent (it receives
//! `handshake` as soon as the socket opens) and the host endpoint (once it
//! sends `initialized`).

use std::future::pending;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::time::{sleep_until, timeout};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use frame_core::Envelope;

use crate::application::{ChannelError, DrawIds, FrameBridge, HostEndpoint};
use crate::domain::BridgeConfig;
use crate::infrastructure::event_bus::LocalEventBus;

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Host endpoint over a WebSocket ────────────────────────────────────────────

/// [`HostEndpoint`] that queues envelopes for the session's writer task.
#[derive(Debug)]
pub struct WsEndpoint {
    tx: UnboundedSender<String>,
}

impl WsEndpoint {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl HostEndpoint for WsEndpoint {
    fn post(&self, envelope: &Envelope) -> Result<(), ChannelError> {
        let text = envelope.to_json()?;
        self.tx.send(text).map_err(|_| ChannelError::Closed)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.host_bind_addr` and serves host windows until `running`
/// is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: BridgeConfig,
    bus: LocalEventBus,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.host_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind host WebSocket listener on {}",
                config.host_bind_addr
            )
        })?;
    info!("host bridge listening on {}", config.host_bind_addr);
    serve(listener, config, bus, running).await;
    Ok(())
}

/// Accept loop over an already bound listener.
///
/// All sessions share one set of draw correlation ids, as they drive the
/// same viewer.
pub async fn serve(
    listener: TcpListener,
    config: BridgeConfig,
    bus: LocalEventBus,
    running: Arc<AtomicBool>,
) {
    let config = Arc::new(config);
    let ids = Arc::new(DrawIds::new());

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let cfg = Arc::clone(&config);
                let ids = Arc::clone(&ids);
                let bus = bus.clone();
                tokio::spawn(async move {
                    handle_host_session(stream, peer_addr, cfg, ids, bus).await;
                });
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            Err(_) => {}
        }
    }
}

// ── Per-session driver ────────────────────────────────────────────────────────

async fn handle_host_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<BridgeConfig>,
    ids: Arc<DrawIds>,
    bus: LocalEventBus,
) {
    let session_id = Uuid::new_v4();
    info!("session {session_id}: host connection from {peer_addr}");
    match run_session(stream, session_id, config, ids, bus).await {
        Ok(()) => info!("session {session_id} closed normally"),
        Err(e) => warn!("session {session_id} closed with error: {e:#}"),
    }
}

/// Runs one host window's bridge until the socket closes.
///
/// # Errors
///
/// Returns an error if the WebSocket upgrade fails or the bridge cannot be
/// attached.
async fn run_session(
    stream: TcpStream,
    session_id: Uuid,
    config: Arc<BridgeConfig>,
    ids: Arc<DrawIds>,
    bus: LocalEventBus,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("session {session_id}: WebSocket handshake failed"))?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Writer task: everything the bridge posts goes out through here.
    let (out_tx, mut out_rx) = unbounded_channel::<String>();
    let mut writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if ws_tx.send(WsMessage::Text(text)).await.is_err() {
                debug!("session {session_id}: WebSocket send failed (host gone)");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let endpoint: Arc<dyn HostEndpoint> = Arc::new(WsEndpoint::new(out_tx));
    let (handle, mut deliveries) = bus.join();
    let mut bridge = FrameBridge::attach((*config).clone(), handle, Arc::clone(&endpoint), ids)
        .with_context(|| format!("session {session_id}: cannot attach bridge"))?;
    info!("session {session_id}: iviewerid={}", bridge.session());

    loop {
        let deadline = bridge.next_deadline();
        tokio::select! {
            frame = ws_rx.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) | None => {
                        debug!("session {session_id}: host WebSocket closed");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("session {session_id}: host WebSocket error: {e}");
                        break;
                    }
                };
                match msg {
                    WsMessage::Text(text) => match serde_json::from_str::<Value>(&text) {
                        Ok(value) => bridge.on_host_message(value, Arc::clone(&endpoint)),
                        Err(_) => debug!("session {session_id}: ignoring non-JSON frame"),
                    },
                    WsMessage::Close(_) => {
                        debug!("session {session_id}: Close frame received");
                        break;
                    }
                    WsMessage::Binary(_) => {
                        debug!("session {session_id}: binary frame ignored");
                    }
                    WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
                }
            }
            Some(event) = deliveries.recv() => {
                bridge.on_bus_event(event, Instant::now());
            }
            _ = wait_for(deadline) => {
                bridge.on_deadline(Instant::now());
            }
            _ = &mut writer => {
                debug!("session {session_id}: writer task ended");
                break;
            }
        }
    }

    let stats = bridge.stats();
    bridge.detach();
    info!(
        "session {session_id}: accepted={} rejected={} dispatched={} invalid={} relayed={}",
        stats.accepted, stats.rejected, stats.dispatched, stats.invalid, stats.relayed
    );
    writer.abort();
    Ok(())
}

/// Sleeps until `deadline`, or forever if there is none.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(tokio::time::Instant::from_std(at)).await,
        None => pending::<()>().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
