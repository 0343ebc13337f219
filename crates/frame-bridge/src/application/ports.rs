//! Ports: the two collaborators the bridge controller talks to.
//!
//! - [`EventBus`] – the viewer's internal publish/subscribe bus.
//! - [`HostEndpoint`] – one window on the other side of the cross-context
//!   channel (the embedding parent, or the host that identified itself).
//!
//! Both are plain traits so the controller can be driven in tests with
//! recording mocks, and in production by the adapters in
//! `infrastructure`.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use frame_core::{Envelope, EnvelopeError};

/// Handle for one bus subscription.  Unique per bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// A delivery on one of the controller's subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub subscription: SubscriptionId,
    pub topic: String,
    pub payload: Value,
}

/// The viewer's event bus, as seen by one participant.
///
/// Deliveries are not returned from these methods; the implementation hands
/// them to the owner out of band (a channel in [`LocalEventBus`]) and the
/// owner feeds them back into the controller as [`BusEvent`]s.
///
/// [`LocalEventBus`]: crate::infrastructure::LocalEventBus
pub trait EventBus: Send {
    /// Publishes `payload` on `topic` to every other subscriber.
    fn publish(&self, topic: &str, payload: Value);

    /// Subscribes until [`dispose`](Self::dispose) is called.
    fn subscribe(&self, topic: &str) -> SubscriptionId;

    /// Subscribes for a single delivery; the bus drops the subscription
    /// after delivering once.
    fn subscribe_once(&self, topic: &str) -> SubscriptionId;

    /// Cancels a subscription.  Unknown or already-spent ids are ignored.
    fn dispose(&self, id: SubscriptionId);
}

/// Failure to deliver an envelope to a host window.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The window went away (socket closed, writer task gone).
    #[error("host channel closed")]
    Closed,

    #[error("could not encode envelope: {0}")]
    Encode(#[from] EnvelopeError),
}

/// One window on the far side of the cross-context channel.
pub trait HostEndpoint: Send + Sync {
    /// Posts `envelope` to the window.  Never blocks.
    fn post(&self, envelope: &Envelope) -> Result<(), ChannelError>;
}

// ── Test doubles ──────────────────────────────────────────────────────────────
