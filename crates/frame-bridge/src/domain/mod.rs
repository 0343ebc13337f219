//! Domain layer for frame-bridge.
//!
//! Pure types with no I/O: the runtime configuration, the host command set
//! with its validation rules, and the connection state machine.
//!
//! Nothing in here touches `tokio`, sockets or the filesystem.

pub mod commands;
pub mod config;
pub mod connection;

pub use commands::{route, AnnotationRequest, Command, CommandError, Route, DEPRECATED_NAMES};
pub use config::{BridgeConfig, ChromeChange};
pub use connection::{Connection, ConnectionState, Readiness};
