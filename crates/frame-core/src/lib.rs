//! # frame-core
//!
//! Shared library for the embedded-frame bridge containing the envelope wire
//! types, the inbound channel filter, session tokens and the names of the
//! viewer's event-bus topics.
//!
//! It has no dependencies on async runtimes, sockets or the event bus
//! implementation.
//!
//! # Architecture overview
//!
//! An image viewer running inside a host page's iframe talks to that page
//! over `postMessage`.  Both directions use one JSON shape, the
//! [`Envelope`].  This crate defines:
//!
//! - **`protocol`** – The envelope, the [`ChannelAuthenticator`] that drops
//!   traffic not meant for this instance, and the [`CorrelationCounter`] used
//!   to match asynchronous replies to requests.
//!
//! - **`session`** – The per-instance [`SessionToken`] the host uses to
//!   address one viewer among several.
//!
//! - **`topics`** – The viewer's internal event-bus topic names, including
//!   the fixed set the bridge mirrors to the host.

pub mod protocol;
pub mod session;
pub mod topics;

pub use protocol::{ChannelAuthenticator, CorrelationCounter, Envelope, EnvelopeError, MessageKind};
pub use session::{SessionError, SessionToken};
