//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built from defaults, then overlaid with an optional TOML file and
//! finally with CLI flags (see `main.rs` and
//! `infrastructure::config_file`).
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads inside the domain) makes the bridge easy to embed in tests.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use frame_core::protocol::DEFAULT_CONTEXT_TAG;

/// Shape kind drawn by `add_annotation` when the host does not name one.
pub const DEFAULT_SHAPE_TYPE: &str = "fixed_arrow";

/// Stroke colour used by `add_annotation` when the host does not give one.
///
/// Colours are signed 32-bit RGBA integers as the viewer stores them;
/// `-65281` is opaque magenta.
pub const DEFAULT_SHAPE_COLOR: i64 = -65281;

/// One host-chrome adjustment applied when the connection completes.
///
/// Published as `UI_MODIFY {subject, action}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromeChange {
    /// UI element, e.g. `"sidebar_left"` or `"header"`.
    pub subject: String,
    /// `"show"`, `"hide"` or `"toggle"`.
    pub action: String,
}

impl ChromeChange {
    pub fn new(subject: &str, action: &str) -> Self {
        Self {
            subject: subject.to_string(),
            action: action.to_string(),
        }
    }
}

/// The layout an embedded viewer switches to once the host is connected:
/// both side panels collapsed and the viewer's own header hidden, since the
/// host page supplies its own chrome.
pub fn default_chrome_layout() -> Vec<ChromeChange> {
    vec![
        ChromeChange::new("sidebar_left", "toggle"),
        ChromeChange::new("sidebar_right", "toggle"),
        ChromeChange::new("header", "hide"),
    ]
}

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use frame_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.host_bind_addr.port(), 24810);
/// assert_eq!(cfg.context_tag, "clovid_integration");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Address the host-facing WebSocket server binds to.
    pub host_bind_addr: SocketAddr,

    /// TCP address of the viewer's event-bus endpoint.
    pub viewer_addr: SocketAddr,

    /// Protocol tag expected in, and stamped on, every envelope.
    pub context_tag: String,

    /// Identifier the host uses to route replies to this viewport
    /// (`vqvpid`), echoed in `handshake` and `initialized`.
    pub host_correlation_id: Option<String>,

    /// Pause between attaching a comment to a freshly drawn shape and
    /// leaving draw mode, so the edit settles in the viewer first.
    pub settle_delay: Duration,

    /// Shape kind used when `add_annotation` omits `shapeType`.
    pub default_shape_type: String,

    /// Stroke colour used when `add_annotation` omits `shapeColor`.
    pub default_shape_color: i64,

    /// Chrome adjustments published when the connection completes.
    pub chrome_layout: Vec<ChromeChange>,
}

impl Default for BridgeConfig {
    /// | Field               | Default                     |
    /// |---------------------|-----------------------------|
    /// | host_bind_addr      | `0.0.0.0:24810`             |
    /// | viewer_addr         | `127.0.0.1:24811`           |
    /// | context_tag         | `clovid_integration`        |
    /// | host_correlation_id | none                        |
    /// | settle_delay        | 100 ms                      |
    /// | default_shape_type  | `fixed_arrow`               |
    /// | default_shape_color | `-65281`                    |
    /// | chrome_layout       | see [`default_chrome_layout`] |
    fn default() -> Self {
        Self {
            host_bind_addr: SocketAddr::from(([0, 0, 0, 0], 24810)),
            viewer_addr: SocketAddr::from(([127, 0, 0, 1], 24811)),
            context_tag: DEFAULT_CONTEXT_TAG.to_string(),
            host_correlation_id: None,
            settle_delay: Duration::from_millis(100),
            default_shape_type: DEFAULT_SHAPE_TYPE.to_string(),
            default_shape_color: DEFAULT_SHAPE_COLOR,
            chrome_layout: default_chrome_layout(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
