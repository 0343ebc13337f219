//! Application layer for frame-bridge.
//!
//! Knows *what* the bridge does with each message but not *how* messages
//! travel: the ports in [`ports`] are implemented by the infrastructure
//! layer (or by test doubles).
//!
//! - [`dispatcher`] – host command → bus publications
//! - [`relay`] – bus deliveries → host events
//! - [`controller`] – [`FrameBridge`], tying both to the connection state

pub mod controller;
pub mod dispatcher;
pub mod ports;
pub mod relay;

pub use controller::{BridgeError, BridgeStats, FrameBridge};
pub use dispatcher::{Dispatcher, DrawIds, Plan, Publication};
pub use ports::{BusEvent, ChannelError, EventBus, HostEndpoint, SubscriptionId};
pub use relay::Relay;
