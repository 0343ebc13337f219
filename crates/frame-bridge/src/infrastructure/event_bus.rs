//! In-process event bus.
//!
//! [`LocalEventBus`] connects the participants of one bridge process: every
//! host session's [`FrameBridge`](crate::application::FrameBridge) and the
//! viewer link.  Each participant calls [`LocalEventBus::join`] (or
//! [`LocalEventBus::join_without_echo`]) and receives a [`BusHandle`] (its
//! [`EventBus`] port) plus an unbounded receiver on which its deliveries
//! arrive.
//!
//! Sessions hear their own publications, like every other subscriber, so the
//! relay mirrors a session's commands back to its host.  The viewer link
//! joins without echo: frames it republishes from the viewer are never
//! written back to the viewer.
//!
//! The last payload published on each of the bus's retained topics
//! ([`RETAINED_TOPICS`] by default) is kept and delivered to every later
//! subscriber of that topic as soon as it subscribes.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use frame_core::topics::RETAINED_TOPICS;

use crate::application::{BusEvent, EventBus, SubscriptionId};

#[derive(Debug)]
struct Subscriber {
    participant: u64,
    topic: String,
    once: bool,
    tx: UnboundedSender<BusEvent>,
}

#[derive(Debug)]
struct Retained {
    publisher: u64,
    payload: Value,
}

#[derive(Debug, Default)]
struct Registry {
    next_subscription: u64,
    next_participant: u64,
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
    retain: Vec<String>,
    retained: HashMap<String, Retained>,
}

/// Shared registry of subscriptions.  Cloning shares the same bus.
#[derive(Debug, Clone)]
pub struct LocalEventBus {
    inner: Arc<Mutex<Registry>>,
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEventBus {
    /// A bus retaining [`RETAINED_TOPICS`].
    pub fn new() -> Self {
        Self::retaining(RETAINED_TOPICS)
    }

    /// A bus retaining the last publication on each of `topics`.
    pub fn retaining(topics: &[&str]) -> Self {
        let registry = Registry {
            retain: topics.iter().map(|t| t.to_string()).collect(),
            ..Registry::default()
        };
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Adds a participant that also receives its own publications.
    pub fn join(&self) -> (BusHandle, UnboundedReceiver<BusEvent>) {
        self.add_participant(true)
    }

    /// Adds a participant that never receives its own publications.
    pub fn join_without_echo(&self) -> (BusHandle, UnboundedReceiver<BusEvent>) {
        self.add_participant(false)
    }

    /// Number of live subscriptions across all participants.
    pub fn subscription_count(&self) -> usize {
        self.registry().subscribers.len()
    }

    /// The payload retained for `topic`, if any.
    pub fn retained(&self, topic: &str) -> Option<Value> {
        self.registry()
            .retained
            .get(topic)
            .map(|r| r.payload.clone())
    }

    /// Forgets every retained payload.  Called when the viewer goes away, as
    /// its state no longer holds.
    pub fn clear_retained(&self) {
        let mut reg = self.registry();
        if !reg.retained.is_empty() {
            debug!("clearing {} retained bus payloads", reg.retained.len());
            reg.retained.clear();
        }
    }

    fn add_participant(&self, echo: bool) -> (BusHandle, UnboundedReceiver<BusEvent>) {
        let (tx, rx) = unbounded_channel();
        let participant = {
            let mut reg = self.registry();
            reg.next_participant += 1;
            reg.next_participant
        };
        let handle = BusHandle {
            participant,
            echo,
            bus: self.clone(),
            tx,
        };
        (handle, rx)
    }

    /// Recovers the registry from a poisoned lock; every update leaves it
    /// consistent.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One participant's view of a [`LocalEventBus`].
///
/// Dropping the handle cancels all of its subscriptions.
#[derive(Debug)]
pub struct BusHandle {
    participant: u64,
    echo: bool,
    bus: LocalEventBus,
    tx: UnboundedSender<BusEvent>,
}

impl BusHandle {
    fn hears(&self, publisher: u64) -> bool {
        self.echo || publisher != self.participant
    }

    fn add(&self, topic: &str, once: bool) -> SubscriptionId {
        let mut reg = self.bus.registry();
        reg.next_subscription += 1;
        let id = SubscriptionId(reg.next_subscription);

        let replayed = match reg.retained.get(topic) {
            Some(last) if self.hears(last.publisher) => {
                trace!("replaying retained {topic} to subscription {id}");
                self.tx
                    .send(BusEvent {
                        subscription: id,
                        topic: topic.to_string(),
                        payload: last.payload.clone(),
                    })
                    .is_ok()
            }
            _ => false,
        };
        if replayed && once {
            return id;
        }

        reg.subscribers.insert(
            id,
            Subscriber {
                participant: self.participant,
                topic: topic.to_string(),
                once,
                tx: self.tx.clone(),
            },
        );
        id
    }
}

impl EventBus for BusHandle {
    fn publish(&self, topic: &str, payload: Value) {
        let mut reg = self.bus.registry();
        let mut spent = Vec::new();

        for (id, sub) in reg.subscribers.iter() {
            if sub.topic != topic || (sub.participant == self.participant && !self.echo) {
                continue;
            }
            let event = BusEvent {
                subscription: *id,
                topic: topic.to_string(),
                payload: payload.clone(),
            };
            // A closed receiver means the participant is gone.
            if sub.tx.send(event).is_err() || sub.once {
                spent.push(*id);
            }
        }
        for id in spent {
            reg.subscribers.remove(&id);
        }

        if reg.retain.iter().any(|t| t == topic) {
            reg.retained.insert(
                topic.to_string(),
                Retained {
                    publisher: self.participant,
                    payload,
                },
            );
        }
        trace!("published {topic}");
    }

    fn subscribe(&self, topic: &str) -> SubscriptionId {
        self.add(topic, false)
    }

    fn subscribe_once(&self, topic: &str) -> SubscriptionId {
        self.add(topic, true)
    }

    fn dispose(&self, id: SubscriptionId) {
        let mut reg = self.bus.registry();
        if reg
            .subscribers
            .get(&id)
            .is_some_and(|s| s.participant == self.participant)
        {
            reg.subscribers.remove(&id);
        }
    }
}

impl Drop for BusHandle {
    fn drop(&mut self) {
        let participant = self.participant;
        self.bus
            .registry()
            .subscribers
            .retain(|_, s| s.participant != participant);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
