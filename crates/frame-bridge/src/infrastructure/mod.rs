//! Infrastructure layer for frame-bridge.
//!
//! All I/O lives here:
//!
//! - [`event_bus`] – the in-process bus shared by sessions and the viewer link
//! - [`host_server`] – WebSocket accept loop, one bridge per host window
//! - [`viewer_conn`] – newline-delimited JSON link to the viewer's bus
//! - [`config_file`] – the optional TOML configuration file
//!
//! Protocol decisions are made in the application layer; nothing here looks
//! inside an envelope beyond parsing it as JSON.

pub mod config_file;
pub mod event_bus;
pub mod host_server;
pub mod viewer_conn;

pub use config_file::{load_config, ConfigError, FileConfig};
pub use event_bus::{BusHandle, LocalEventBus};
pub use host_server::run_server;
pub use viewer_conn::run_viewer_link;
