//! Outbound relay: mirrors a fixed set of bus topics to the host.
//!
//! Once the host has identified itself, every delivery on one of
//! [`RELAY_TOPICS`](frame_core::topics::RELAY_TOPICS) is wrapped as
//! `{context, type:"event", name:<topic>, params:<payload>}` and posted to
//! the host endpoint.

use serde_json::{json, Value};

use frame_core::protocol::host_events;
use frame_core::topics::RELAY_TOPICS;
use frame_core::{Envelope, SessionToken};

use super::ports::{EventBus, SubscriptionId};

/// The relay's subscription set.  Empty until [`establish`](Self::establish).
#[derive(Debug, Default)]
pub struct Relay {
    subscriptions: Vec<SubscriptionId>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_established(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Subscribes to every relay topic.  Does nothing if already established.
    pub fn establish<B: EventBus + ?Sized>(&mut self, bus: &B) {
        if self.is_established() {
            return;
        }
        self.subscriptions = RELAY_TOPICS.iter().map(|t| bus.subscribe(t)).collect();
    }

    pub fn owns(&self, id: SubscriptionId) -> bool {
        self.subscriptions.contains(&id)
    }

    /// Disposes every relay subscription.
    pub fn dispose<B: EventBus + ?Sized>(&mut self, bus: &B) {
        for id in self.subscriptions.drain(..) {
            bus.dispose(id);
        }
    }
}

/// Wraps one bus delivery for the host.
pub fn relay_envelope(context: &str, topic: &str, payload: Value) -> Envelope {
    Envelope::event(context, topic).with_params(payload)
}

/// `{iviewerid, vqvpid}`: identifies this instance to the embedding page.
pub fn instance_params(session: &SessionToken, vqvpid: Option<&str>) -> Value {
    json!({ "iviewerid": session.as_str(), "vqvpid": vqvpid })
}

/// Tells the parent which shapes the viewer has loaded for the image.
pub fn annotations_loaded(
    context: &str,
    session: &SessionToken,
    vqvpid: Option<&str>,
    shapes: Vec<Value>,
) -> Envelope {
    Envelope::event(context, host_events::ANNOTATIONS_LOADED)
        .with_params(instance_params(session, vqvpid))
        .with_payload(json!({ "shapes": shapes }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
