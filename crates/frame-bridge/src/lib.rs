//! frame-bridge library crate.
//!
//! Connects an image viewer embedded in a host page to that page: commands
//! from the host become publications on the viewer's event bus, and a fixed
//! set of bus topics is mirrored back to the host.
//!
//! # Architecture
//!
//! ```text
//! Host window (JSON envelopes over WebSocket)
//!         ↕
//! [frame-bridge]
//!   ├── domain/           BridgeConfig, host commands, connection state
//!   ├── application/      FrameBridge controller, dispatcher, relay, ports
//!   └── infrastructure/
//!         ├── host_server/  WebSocket accept loop (tokio-tungstenite)
//!         ├── event_bus/    in-process bus
//!         ├── viewer_conn/  TCP link to the viewer's bus
//!         └── config_file/  TOML settings
//!         ↕
//! Viewer event bus (newline-delimited JSON over TCP)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `frame-core`; it reaches the
//!   outside world only through the traits in `application::ports`.
//! - `infrastructure` implements those traits with `tokio`.

/// Domain layer: configuration, commands and connection state (no I/O).
pub mod domain;

/// Application layer: the bridge controller and its ports.
pub mod application;

/// Infrastructure layer: WebSocket server, event bus and viewer link.
pub mod infrastructure;
