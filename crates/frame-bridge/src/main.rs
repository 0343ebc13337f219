//! Embedded-frame bridge: entry point.
//!
//! Serves host windows over WebSocket and links them to the embedded
//! viewer's event bus.  Each host connection gets its own bridge instance
//! (session token, connection state, relay subscriptions); all instances
//! share one in-process bus that is linked to the viewer over TCP.
//!
//! # Usage
//!
//! ```text
//! frame-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>          TOML configuration file
//!   --host-bind <IP>         WebSocket bind address       [default: 0.0.0.0]
//!   --host-port <PORT>       WebSocket port               [default: 24810]
//!   --viewer-host <IP>       Viewer bus host              [default: 127.0.0.1]
//!   --viewer-port <PORT>     Viewer bus port              [default: 24811]
//!   --context-tag <TAG>      Protocol tag                 [default: clovid_integration]
//!   --vqvpid <ID>            Host correlation id echoed in handshake
//!   --settle-delay-ms <MS>   Delay before leaving draw mode [default: 100]
//!   --log-level <LEVEL>      Log level when RUST_LOG is unset [default: info]
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the `--config` file, then environment variables
//! and CLI flags.  CLI flags win over environment variables.
//!
//! | Variable                        | Flag                |
//! |---------------------------------|---------------------|
//! | `FRAME_BRIDGE_CONFIG`           | `--config`          |
//! | `FRAME_BRIDGE_HOST_BIND`        | `--host-bind`       |
//! | `FRAME_BRIDGE_HOST_PORT`        | `--host-port`       |
//! | `FRAME_BRIDGE_VIEWER_HOST`      | `--viewer-host`     |
//! | `FRAME_BRIDGE_VIEWER_PORT`      | `--viewer-port`     |
//! | `FRAME_BRIDGE_CONTEXT_TAG`      | `--context-tag`     |
//! | `FRAME_BRIDGE_VQVPID`           | `--vqvpid`          |
//! | `FRAME_BRIDGE_SETTLE_DELAY_MS`  | `--settle-delay-ms` |
//! | `FRAME_BRIDGE_LOG_LEVEL`        | `--log-level`       |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use frame_bridge::domain::BridgeConfig;
use frame_bridge::infrastructure::{
    load_config, run_server, run_viewer_link, FileConfig, LocalEventBus,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Embedded-frame bridge.
///
/// Every option is optional: unset options keep the value from the config
/// file or the built-in default.
#[derive(Debug, Default, Parser)]
#[command(
    name = "frame-bridge",
    about = "Bridges an embedded image viewer's event bus to its host window",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "FRAME_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// IP address the host WebSocket server binds to.
    #[arg(long, env = "FRAME_BRIDGE_HOST_BIND")]
    host_bind: Option<String>,

    /// Port of the host WebSocket server.
    #[arg(long, env = "FRAME_BRIDGE_HOST_PORT")]
    host_port: Option<u16>,

    /// IP address of the viewer's bus endpoint.
    #[arg(long, env = "FRAME_BRIDGE_VIEWER_HOST")]
    viewer_host: Option<String>,

    /// Port of the viewer's bus endpoint.
    #[arg(long, env = "FRAME_BRIDGE_VIEWER_PORT")]
    viewer_port: Option<u16>,

    /// Protocol tag carried by every envelope.
    #[arg(long, env = "FRAME_BRIDGE_CONTEXT_TAG")]
    context_tag: Option<String>,

    /// Host correlation id echoed in `handshake` and `initialized`.
    #[arg(long, env = "FRAME_BRIDGE_VQVPID")]
    vqvpid: Option<String>,

    /// Delay between attaching a comment and leaving draw mode.
    #[arg(long, env = "FRAME_BRIDGE_SETTLE_DELAY_MS")]
    settle_delay_ms: Option<u64>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "FRAME_BRIDGE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Overlays the options that were given onto `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if `--host-bind` or `--viewer-host` is not an IP
    /// address.
    fn apply_to(&self, config: &mut BridgeConfig) -> anyhow::Result<()> {
        config.host_bind_addr = overlay_addr(
            config.host_bind_addr,
            self.host_bind.as_deref(),
            self.host_port,
        )
        .context("invalid --host-bind")?;
        config.viewer_addr = overlay_addr(
            config.viewer_addr,
            self.viewer_host.as_deref(),
            self.viewer_port,
        )
        .context("invalid --viewer-host")?;

        if let Some(tag) = &self.context_tag {
            config.context_tag = tag.clone();
        }
        if let Some(id) = &self.vqvpid {
            config.host_correlation_id = Some(id.clone());
        }
        if let Some(ms) = self.settle_delay_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        Ok(())
    }

    /// Loads the config file (if any) and layers this CLI on top.
    ///
    /// Returns the resulting configuration and the log level to use.
    fn resolve(&self) -> anyhow::Result<(BridgeConfig, String)> {
        let file = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("cannot load config file {}", path.display()))?,
            None => FileConfig::default(),
        };

        let mut config = BridgeConfig::default();
        file.apply_to(&mut config)?;
        self.apply_to(&mut config)?;

        let log_level = self
            .log_level
            .clone()
            .unwrap_or_else(|| file.log_level().to_string());
        Ok((config, log_level))
    }
}

/// Replaces the IP and/or port of `addr` with the given overrides.
fn overlay_addr(
    addr: SocketAddr,
    ip: Option<&str>,
    port: Option<u16>,
) -> anyhow::Result<SocketAddr> {
    let ip: IpAddr = match ip {
        Some(text) => text
            .parse()
            .with_context(|| format!("'{text}' is not an IP address"))?,
        None => addr.ip(),
    };
    Ok(SocketAddr::new(ip, port.unwrap_or(addr.port())))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, log_level) = cli.resolve()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    info!(
        "frame bridge starting: host={}, viewer={}, context={}",
        config.host_bind_addr, config.viewer_addr, config.context_tag
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let bus = LocalEventBus::new();
    tokio::spawn(run_viewer_link(
        config.viewer_addr,
        bus.clone(),
        Arc::clone(&running),
    ));

    run_server(config, bus, running).await?;

    info!("frame bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
