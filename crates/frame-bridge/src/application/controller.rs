//! [`FrameBridge`]: the per-instance bridge controller.
//!
//! The controller is a synchronous state machine with no I/O of its own.  An
//! infrastructure driver feeds it three kinds of input and it answers by
//! calling the [`EventBus`] and [`HostEndpoint`] ports:
//!
//! | Input                                   | Method                            |
//! |-----------------------------------------|-----------------------------------|
//! | a message from the host window          | [`FrameBridge::on_host_message`]  |
//! | a delivery on one of its subscriptions  | [`FrameBridge::on_bus_event`]     |
//! | the next deadline elapsing              | [`FrameBridge::on_deadline`]      |
//!
//! Timers are plain deadlines: the driver sleeps until
//! [`FrameBridge::next_deadline`] and then calls `on_deadline`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use frame_core::protocol::host_events;
use frame_core::session::RandomSourceError;
use frame_core::{
    topics, ChannelAuthenticator, Envelope, MessageKind, SessionError, SessionToken,
};

use crate::domain::{route, BridgeConfig, Command, Connection, ConnectionState, Readiness, Route};

use super::dispatcher::{
    abort_draw, attach_comment, completion_publications, generated_hist_id, shape_ids,
    Dispatcher, DrawIds, PendingDraw, Publication,
};
use super::ports::{BusEvent, EventBus, HostEndpoint, SubscriptionId};
use super::relay::{annotations_loaded, instance_params, relay_envelope, Relay};

// ── Error type ────────────────────────────────────────────────────────────────

/// Fatal errors of the bridge controller.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The OS random source could not produce a session token.
    #[error("cannot create session token: {0}")]
    Session(#[from] SessionError),
}

// ── Counters ──────────────────────────────────────────────────────────────────

/// Message counters for one controller, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Host messages that passed the channel filter.
    pub accepted: u64,
    /// Host messages dropped by the channel filter.
    pub rejected: u64,
    /// Commands translated into bus publications.
    pub dispatched: u64,
    /// Commands dropped because their payload failed validation.
    pub invalid: u64,
    /// Accepted messages that were not commands, or unknown commands.
    pub ignored: u64,
    /// Bus deliveries posted to the host.
    pub relayed: u64,
    /// Bus deliveries dropped because no host had identified itself.
    pub dropped_relay: u64,
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Bridge between one embedded viewer instance and its host window.
pub struct FrameBridge<B: EventBus> {
    config: BridgeConfig,
    bus: B,
    session: SessionToken,
    auth: ChannelAuthenticator,
    connection: Connection,
    dispatcher: Dispatcher,
    relay: Relay,

    /// Receives `handshake` and `annotations_loaded`.
    parent: Arc<dyn HostEndpoint>,
    /// Set by the host's `initialized`; receives relayed traffic.
    host: Option<Arc<dyn HostEndpoint>>,

    /// `config_id` of the viewed image; `-1` until the viewer reports it.
    config_id: i64,

    viewer_ready_sub: Option<SubscriptionId>,
    regions_loaded_sub: Option<SubscriptionId>,
    pending_draws: HashMap<SubscriptionId, PendingDraw>,
    /// Publications waiting for their settle delay, in scheduling order.
    deferred: Vec<(Instant, Publication)>,

    stats: BridgeStats,
    detached: bool,
}

impl<B: EventBus> FrameBridge<B> {
    /// Creates a controller with a fresh session token and posts the
    /// `handshake` to `parent`.
    ///
    /// `ids` must be shared by every controller attached to the same viewer.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Session`] if the random source fails.  Nothing
    /// is subscribed or posted in that case.
    pub fn attach(
        config: BridgeConfig,
        bus: B,
        parent: Arc<dyn HostEndpoint>,
        ids: Arc<DrawIds>,
    ) -> Result<Self, BridgeError> {
        let session = SessionToken::generate()?;
        Ok(Self::attach_with_session(config, bus, parent, ids, session))
    }

    /// Like [`attach`](Self::attach), drawing the token from `fill` instead
    /// of the OS random source.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Session`] if `fill` fails.
    pub fn attach_with_random<F>(
        config: BridgeConfig,
        bus: B,
        parent: Arc<dyn HostEndpoint>,
        ids: Arc<DrawIds>,
        fill: F,
    ) -> Result<Self, BridgeError>
    where
        F: FnOnce(&mut [u8]) -> Result<(), RandomSourceError>,
    {
        let session = SessionToken::generate_with(fill)?;
        Ok(Self::attach_with_session(config, bus, parent, ids, session))
    }

    /// Like [`attach`](Self::attach) with a caller-supplied token.
    pub fn attach_with_session(
        config: BridgeConfig,
        bus: B,
        parent: Arc<dyn HostEndpoint>,
        ids: Arc<DrawIds>,
        session: SessionToken,
    ) -> Self {
        let auth = ChannelAuthenticator::new(config.context_tag.clone(), session.clone());
        let dispatcher = Dispatcher::new(&config, ids);

        // Persistent: a retained payload arrives right away if the viewer is
        // already up, and later announcements refresh `config_id`.
        let viewer_ready_sub = Some(bus.subscribe(topics::VIEWER_INITIALIZED));
        let regions_loaded_sub = Some(bus.subscribe(topics::REGIONS_INFORMATION_RETRIEVED));

        let mut bridge = Self {
            config,
            bus,
            session,
            auth,
            connection: Connection::new(),
            dispatcher,
            relay: Relay::new(),
            parent,
            host: None,
            config_id: -1,
            viewer_ready_sub,
            regions_loaded_sub,
            pending_draws: HashMap::new(),
            deferred: Vec::new(),
            stats: BridgeStats::default(),
            detached: false,
        };
        bridge.send_handshake();
        bridge
    }

    pub fn session(&self) -> &SessionToken {
        &self.session
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn config_id(&self) -> i64 {
        self.config_id
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Number of draw requests still waiting for their generated shape.
    pub fn pending_draws(&self) -> usize {
        self.pending_draws.len()
    }

    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    // ── Host input ────────────────────────────────────────────────────────────

    /// Handles one message from the host window.
    ///
    /// `source` is the window that sent it; it becomes the host endpoint if
    /// the message is the host's `initialized` event.
    pub fn on_host_message(&mut self, message: Value, source: Arc<dyn HostEndpoint>) {
        if self.detached {
            return;
        }
        if !self.auth.accept(&message) {
            self.stats.rejected += 1;
            return;
        }
        self.stats.accepted += 1;

        let envelope = match Envelope::from_value(message) {
            Ok(env) => env,
            Err(e) => {
                debug!("ignoring unreadable host message: {e}");
                self.stats.ignored += 1;
                return;
            }
        };

        if envelope.kind == MessageKind::Event && envelope.name == host_events::INITIALIZED {
            self.on_host_initialized(source);
            return;
        }

        match route(envelope.kind, &envelope.name) {
            Route::Action(name) => self.dispatch(name, envelope.payload.as_ref()),
            Route::Deprecated { legacy, canonical } => {
                warn!(
                    "host sent deprecated {} '{}'; treating it as action '{}'",
                    envelope.kind.as_str(),
                    legacy,
                    canonical
                );
                self.dispatch(canonical, envelope.payload.as_ref());
            }
            Route::Ignored => {
                debug!(
                    "ignoring host {} '{}'",
                    envelope.kind.as_str(),
                    envelope.name
                );
                self.stats.ignored += 1;
            }
        }
    }

    fn on_host_initialized(&mut self, source: Arc<dyn HostEndpoint>) {
        self.host = Some(source);
        self.relay.establish(&self.bus);

        match self.connection.host_ready() {
            Readiness::Completed => self.complete(),
            Readiness::Waiting => debug!("host ready; waiting for the viewer"),
            Readiness::Repeated => debug!("host re-initialized; endpoint refreshed"),
        }
    }

    fn dispatch(&mut self, name: &str, payload: Option<&Value>) {
        let command = match Command::parse(name, payload) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => {
                debug!("ignoring unknown host action '{name}'");
                self.stats.ignored += 1;
                return;
            }
            Err(e) => {
                warn!("dropping invalid host command: {e}");
                self.stats.invalid += 1;
                return;
            }
        };

        debug!("dispatching '{}'", command.name());
        let plan = self.dispatcher.plan(command, self.config_id);

        if plan.discard_pending {
            self.discard_pending_draws();
        }
        for p in plan.publications {
            self.bus.publish(p.topic, p.payload);
        }
        if let Some(draw) = plan.await_shape {
            let sub = self.bus.subscribe(topics::REGIONS_SHAPE_GENERATED);
            self.pending_draws.insert(sub, draw);
        }
        self.stats.dispatched += 1;
    }

    // ── Bus input ─────────────────────────────────────────────────────────────

    /// Handles a delivery on one of this controller's subscriptions.
    ///
    /// `now` anchors any settle delay the delivery schedules.
    pub fn on_bus_event(&mut self, event: BusEvent, now: Instant) {
        if self.detached {
            return;
        }
        let id = event.subscription;
        self.observe_config_id(&event.topic, &event.payload);

        if self.viewer_ready_sub == Some(id) {
            self.on_viewer_initialized();
        } else if self.regions_loaded_sub == Some(id) {
            let shapes = shape_ids(&event.payload);
            debug!("viewer loaded {} shapes", shapes.len());
            let env = annotations_loaded(
                &self.config.context_tag,
                &self.session,
                self.config.host_correlation_id.as_deref(),
                shapes,
            );
            self.post_to_parent(&env);
        } else if self.pending_draws.contains_key(&id) {
            self.on_shape_generated(id, &event.payload, now);
        } else if self.relay.owns(id) {
            self.relay_to_host(&event.topic, event.payload);
        } else {
            trace!("delivery on stale subscription {id} ({})", event.topic);
        }
    }

    fn on_viewer_initialized(&mut self) {
        match self.connection.viewer_ready() {
            Readiness::Completed => self.complete(),
            Readiness::Waiting => debug!("viewer ready; waiting for the host"),
            Readiness::Repeated => debug!("viewer re-announced (config_id={})", self.config_id),
        }
    }

    /// Follows the image the viewer currently shows.  Only viewer
    /// notifications count; command topics carry whatever id their sender
    /// had, and negative ids mean "no particular image".
    fn observe_config_id(&mut self, topic: &str, payload: &Value) {
        if topics::VIEWER_COMMAND_TOPICS.contains(&topic) {
            return;
        }
        let Some(cid) = payload.get("config_id").and_then(Value::as_i64) else {
            return;
        };
        if cid >= 0 && cid != self.config_id {
            debug!("config_id {} -> {cid} (from {topic})", self.config_id);
            self.config_id = cid;
        }
    }

    fn on_shape_generated(&mut self, id: SubscriptionId, payload: &Value, now: Instant) {
        let Some(draw) = self.pending_draws.get(&id) else {
            return;
        };
        if generated_hist_id(payload) != Some(draw.hist_id) {
            trace!("generated shape belongs to another request");
            return;
        }
        let Some(draw) = self.pending_draws.remove(&id) else {
            return;
        };
        self.bus.dispose(id);
        debug!("draw request {} produced its shape", draw.hist_id);

        if let Some(comment) = draw.comment.as_deref() {
            let p = attach_comment(self.config_id, shape_ids(payload), comment);
            self.bus.publish(p.topic, p.payload);
        }
        self.deferred
            .push((now + self.config.settle_delay, abort_draw(self.config_id)));
    }

    fn relay_to_host(&mut self, topic: &str, payload: Value) {
        let Some(host) = self.host.as_ref() else {
            self.stats.dropped_relay += 1;
            return;
        };
        let env = relay_envelope(&self.config.context_tag, topic, payload);
        match host.post(&env) {
            Ok(()) => self.stats.relayed += 1,
            Err(e) => {
                warn!("failed to relay {topic} to host: {e}");
                self.stats.dropped_relay += 1;
            }
        }
    }

    // ── Timers ────────────────────────────────────────────────────────────────

    /// The earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deferred.iter().map(|(at, _)| *at).min()
    }

    /// Runs every deferred publication due at or before `now`.
    pub fn on_deadline(&mut self, now: Instant) {
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.deferred = later;
        for (_, p) in due {
            self.bus.publish(p.topic, p.payload);
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    fn send_handshake(&mut self) {
        if !self.connection.handshake_sent() {
            return;
        }
        let env = Envelope::event(&self.config.context_tag, host_events::HANDSHAKE)
            .with_params(self.instance_params());
        self.post_to_parent(&env);
        info!("handshake sent (iviewerid={})", self.session);
    }

    /// The completion step: chrome layout, viewer tweaks, then the
    /// acknowledgement to the host.
    fn complete(&mut self) {
        for p in completion_publications(&self.config.chrome_layout) {
            self.bus.publish(p.topic, p.payload);
        }
        let ack = Envelope::event(&self.config.context_tag, host_events::INITIALIZED)
            .with_params(self.instance_params());
        if let Some(host) = self.host.as_ref() {
            if let Err(e) = host.post(&ack) {
                warn!("failed to acknowledge host initialization: {e}");
            }
        }
        info!("connected (iviewerid={}, config_id={})", self.session, self.config_id);
    }

    fn instance_params(&self) -> Value {
        instance_params(&self.session, self.config.host_correlation_id.as_deref())
    }

    fn post_to_parent(&self, env: &Envelope) {
        if let Err(e) = self.parent.post(env) {
            warn!("failed to post '{}' to parent: {e}", env.name);
        }
    }

    fn discard_pending_draws(&mut self) {
        for (id, _) in self.pending_draws.drain() {
            self.bus.dispose(id);
        }
    }

    /// Disposes every subscription and drops pending timers.  Idempotent;
    /// also run on drop.
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;

        if let Some(id) = self.viewer_ready_sub.take() {
            self.bus.dispose(id);
        }
        if let Some(id) = self.regions_loaded_sub.take() {
            self.bus.dispose(id);
        }
        self.discard_pending_draws();
        self.relay.dispose(&self.bus);
        self.deferred.clear();
        self.host = None;
        self.connection.reset();
        info!("detached (iviewerid={})", self.session);
    }
}

impl<B: EventBus> Drop for FrameBridge<B> {
    fn drop(&mut self) {
        self.detach();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::application::ports::mock::{RecordingBus, RecordingEndpoint};
    use frame_core::topics::RELAY_TOPICS;

    const TAG: &str = "clovid_integration";

    struct Harness {
        bridge: FrameBridge<RecordingBus>,
        bus: RecordingBus,
        parent: Arc<RecordingEndpoint>,
        host: Arc<RecordingEndpoint>,
    }

    fn harness() -> Harness {
        harness_with(BridgeConfig::default())
    }

    fn harness_with(config: BridgeConfig) -> Harness {
        let bus = RecordingBus::new();
        let parent = RecordingEndpoint::new();
        let host = RecordingEndpoint::new();
        let ids = Arc::new(DrawIds::new());
        let bridge = FrameBridge::attach(config, bus.clone(), parent.clone(), ids).unwrap();
        Harness { bridge, bus, parent, host }
    }

    impl Harness {
        fn token(&self) -> String {
            self.bridge.session().to_string()
        }

        fn send(&mut self, message: Value) {
            let source: Arc<dyn HostEndpoint> = self.host.clone();
            self.bridge.on_host_message(message, source);
        }

        fn action(&mut self, name: &str, payload: Value) {
            let msg = json!({
                "context": TAG, "type": "action", "name": name,
                "payload": payload, "target": self.token()
            });
            self.send(msg);
        }

        fn host_initialized(&mut self) {
            let msg = json!({
                "context": TAG, "type": "event", "name": "initialized", "target": self.token()
            });
            self.send(msg);
        }

        fn viewer_initialized(&mut self, config_id: i64) {
            let event = self
                .bus
                .deliver(topics::VIEWER_INITIALIZED, json!({ "config_id": config_id }))
                .expect("viewer-ready subscription");
            self.bridge.on_bus_event(event, Instant::now());
        }

        fn deliver(&mut self, topic: &str, payload: Value, now: Instant) {
            let event = self.bus.deliver(topic, payload).expect("live subscription");
            self.bridge.on_bus_event(event, now);
        }
    }

    // ── attach ────────────────────────────────────────────────────────────────

    #[test]
    fn test_attach_posts_one_handshake_with_token() {
        // Arrange / Act
        let h = harness_with(BridgeConfig {
            host_correlation_id: Some("vp-9".to_string()),
            ..BridgeConfig::default()
        });

        // Assert
        let posted = h.parent.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].name, "handshake");
        assert_eq!(posted[0].kind, MessageKind::Event);
        assert_eq!(
            posted[0].params,
            Some(json!({"iviewerid": h.token(), "vqvpid": "vp-9"}))
        );
        assert_eq!(h.bridge.state(), ConnectionState::HandshakeSent);
    }

    #[test]
    fn test_attach_subscribes_viewer_ready_and_region_info() {
        let h = harness();
        assert_eq!(h.bus.subscriptions_on(topics::VIEWER_INITIALIZED).len(), 1);
        assert_eq!(
            h.bus.subscriptions_on(topics::REGIONS_INFORMATION_RETRIEVED).len(),
            1
        );
        assert_eq!(h.bridge.config_id(), -1);
    }

    #[test]
    fn test_attach_fails_cleanly_without_randomness() {
        // Arrange
        let bus = RecordingBus::new();
        let parent = RecordingEndpoint::new();

        // Act
        let result = FrameBridge::attach_with_random(
            BridgeConfig::default(),
            bus.clone(),
            parent.clone(),
            Arc::new(DrawIds::new()),
            |_| Err(RandomSourceError::UNSUPPORTED),
        );

        // Assert: an error, and no trace on the bus or the parent
        let err = result.err().expect("attach must fail");
        assert!(matches!(err, BridgeError::Session(_)));
        assert!(err.to_string().starts_with("cannot create session token"));
        assert_eq!(bus.live_count(), 0);
        assert!(bus.published().is_empty());
        assert!(parent.posted().is_empty());
    }

    #[test]
    fn test_attach_with_random_uses_supplied_bytes() {
        let bridge = FrameBridge::attach_with_random(
            BridgeConfig::default(),
            RecordingBus::new(),
            RecordingEndpoint::new(),
            Arc::new(DrawIds::new()),
            |buf| {
                buf.fill(0xAB);
                Ok(())
            },
        )
        .unwrap();
        assert!(bridge.session().as_str().chars().all(|c| c == 'a' || c == 'b'));
    }

    // ── filtering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_wrong_context_is_rejected_without_effect() {
        let mut h = harness();
        h.send(json!({"context": "other", "type": "action", "name": "zoom_to_fit"}));

        assert!(h.bus.published().is_empty());
        assert_eq!(h.bridge.stats().rejected, 1);
        assert_eq!(h.bridge.stats().dispatched, 0);
    }

    #[test]
    fn test_mismatched_target_is_rejected() {
        let mut h = harness();
        h.send(json!({
            "context": TAG, "type": "action", "name": "zoom_to_fit", "target": "0000"
        }));

        assert!(h.bus.published().is_empty());
        assert_eq!(h.bridge.stats().rejected, 1);
    }

    #[test]
    fn test_untargeted_message_with_context_is_accepted() {
        let mut h = harness();
        h.send(json!({"context": TAG, "type": "action", "name": "zoom_to_fit"}));
        assert_eq!(h.bus.published_on(topics::VIEWER_ZOOM_TO_FIT).len(), 1);
    }

    #[test]
    fn test_unknown_type_and_name_are_ignored() {
        let mut h = harness();
        h.send(json!({"context": TAG, "type": "query", "name": "zoom_to_fit"}));
        h.action("rotate", json!({}));

        assert!(h.bus.published().is_empty());
        assert_eq!(h.bridge.stats().ignored, 2);
    }

    // ── connection ────────────────────────────────────────────────────────────

    #[test]
    fn test_connects_when_host_then_viewer() {
        // Arrange
        let mut h = harness();

        // Act
        h.host_initialized();
        let before = h.bridge.state();
        h.viewer_initialized(42);

        // Assert
        assert_eq!(before, ConnectionState::HandshakeSent);
        assert_eq!(h.bridge.state(), ConnectionState::Connected);
        assert_eq!(h.host.posted_named("initialized").len(), 1);
        assert_eq!(h.bus.published_on(topics::UI_MODIFY).len(), 3);
        assert_eq!(h.bridge.config_id(), 42);
    }

    #[test]
    fn test_connects_when_viewer_then_host() {
        let mut h = harness();

        h.viewer_initialized(7);
        assert_eq!(h.bridge.state(), ConnectionState::HandshakeSent);
        h.host_initialized();

        assert_eq!(h.bridge.state(), ConnectionState::Connected);
        let acks = h.host.posted_named("initialized");
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].params.as_ref().unwrap()["iviewerid"], h.token());
        assert_eq!(
            h.bus.published_on(topics::VIEWER_REMOVE_INTERACTION_OR_CONTROL),
            vec![json!({"args": ["fullscreen"]})]
        );
        assert_eq!(
            h.bus.published_on(topics::VIEWER_SET_SHAPE_POPUP_VISIBILITY),
            vec![Value::Bool(false)]
        );
    }

    #[test]
    fn test_viewer_reannouncement_updates_config_id_only() {
        // Arrange: connected on image 1
        let mut h = harness();
        h.host_initialized();
        h.viewer_initialized(1);
        h.bus.clear_published();

        // Act: the viewer switches image and announces itself again
        h.viewer_initialized(8);
        h.action("zoom_to_fit", json!(null));

        // Assert: no second completion, commands follow the new image
        assert_eq!(h.host.posted_named("initialized").len(), 1);
        assert_eq!(h.bus.subscriptions_on(topics::VIEWER_INITIALIZED).len(), 1);
        assert_eq!(
            h.bus.published(),
            vec![(topics::VIEWER_ZOOM_TO_FIT.to_string(), json!({"config_id": 8}))]
        );
    }

    #[test]
    fn test_config_id_follows_viewer_notifications() {
        // Arrange
        let mut h = harness();
        h.host_initialized();
        h.viewer_initialized(1);

        // Act: a viewer notification naming another image, then traffic that
        // must not move it (a command echo and a window-wide event)
        let now = Instant::now();
        h.deliver(topics::IMAGE_SETTINGS_CHANGE, json!({"config_id": 6}), now);
        h.deliver(topics::REGIONS_DRAW_SHAPE, json!({"config_id": 99, "abort": true}), now);
        h.deliver(
            topics::IMAGE_VIEWER_RESIZE,
            json!({"config_id": -1, "window_resize": true}),
            now,
        );

        // Assert
        assert_eq!(h.bridge.config_id(), 6);
    }

    #[test]
    fn test_repeated_initialized_refreshes_endpoint_only() {
        // Arrange: connected
        let mut h = harness();
        h.host_initialized();
        h.viewer_initialized(1);
        h.bus.clear_published();
        let second_host = RecordingEndpoint::new();

        // Act: host re-initializes from a new window
        let msg = json!({
            "context": TAG, "type": "event", "name": "initialized", "target": h.token()
        });
        let source: Arc<dyn HostEndpoint> = second_host.clone();
        h.bridge.on_host_message(msg, source);
        h.deliver("IMAGE_CANVAS_DATA", json!({"w": 1}), Instant::now());

        // Assert: no second completion, relays reach the new window, no
        // duplicate relay subscriptions
        assert!(h.bus.published().is_empty());
        assert!(second_host.posted_named("initialized").is_empty());
        assert_eq!(second_host.posted_named("IMAGE_CANVAS_DATA").len(), 1);
        assert!(h.host.posted_named("IMAGE_CANVAS_DATA").is_empty());
        assert_eq!(h.bus.subscriptions_on("IMAGE_CANVAS_DATA").len(), 1);
    }

    // ── dispatch ──────────────────────────────────────────────────────────────

    #[test]
    fn test_commands_use_learned_config_id() {
        let mut h = harness();
        h.viewer_initialized(12);
        h.action("prepare", json!(null));

        assert_eq!(
            h.bus.published_on(topics::REGIONS_REQUEST_DATA),
            vec![json!({"config_id": 12})]
        );
    }

    #[test]
    fn test_empty_annotation_ids_are_rejected() {
        let mut h = harness();
        h.action("hide_annotations", json!({"annotationIds": []}));
        h.action("show_annotations", json!({"annotationIds": []}));

        assert!(h.bus.published().is_empty());
        assert_eq!(h.bridge.stats().invalid, 2);
    }

    #[test]
    fn test_deprecated_new_point_matches_add_annotation() {
        // Arrange: two independent bridges
        let mut legacy = harness();
        let mut modern = harness();
        let payload = json!({"shapeType": "ellipse", "shapeColor": "255"});

        // Act
        let msg = json!({
            "context": TAG, "type": "event", "name": "newPoint",
            "payload": payload.clone(), "target": legacy.token()
        });
        legacy.send(msg);
        modern.action("add_annotation", payload);

        // Assert
        assert_eq!(legacy.bus.published(), modern.bus.published());
        assert_eq!(legacy.bus.published().len(), 1);
    }

    #[test]
    fn test_repeated_action_publishes_twice() {
        let mut h = harness();
        h.action("zoom_to_fit", json!(null));
        h.action("zoom_to_fit", json!(null));
        assert_eq!(h.bus.published_on(topics::VIEWER_ZOOM_TO_FIT).len(), 2);
        assert_eq!(h.bridge.stats().dispatched, 2);
    }

    // ── annotation completion ────────────────────────────────────────────────

    #[test]
    fn test_add_annotation_with_comment_full_sequence() {
        // Arrange
        let mut h = harness();
        h.viewer_initialized(3);
        h.bus.clear_published();
        let t0 = Instant::now();

        // Act 1: the host asks for a shape with a comment
        h.action("add_annotation", json!({"shapeComment": "note"}));
        let draw = h.bus.published_on(topics::REGIONS_DRAW_SHAPE);
        assert_eq!(draw.len(), 1);
        let hist_id = draw[0]["hist_id"].clone();

        // Act 2: an unrelated shape is generated first
        h.deliver(
            topics::REGIONS_SHAPE_GENERATED,
            json!({"hist_id": 999, "shapes": ["9:9"]}),
            t0,
        );
        assert_eq!(h.bridge.pending_draws(), 1);
        assert!(h.bus.published_on(topics::REGIONS_MODIFY_SHAPES).is_empty());

        // Act 3: our shape arrives
        h.deliver(
            topics::REGIONS_SHAPE_GENERATED,
            json!({"hist_id": hist_id, "shapes": [{"shape_id": "-1:-1"}]}),
            t0,
        );

        // Assert: comment attached, subscription gone, abort deferred
        assert_eq!(
            h.bus.published_on(topics::REGIONS_MODIFY_SHAPES),
            vec![json!({"config_id": 3, "shapes": ["-1:-1"], "definition": {"Text": "note"}})]
        );
        assert_eq!(h.bridge.pending_draws(), 0);
        assert!(h.bus.subscriptions_on(topics::REGIONS_SHAPE_GENERATED).is_empty());
        assert_eq!(h.bridge.next_deadline(), Some(t0 + Duration::from_millis(100)));

        // Act 4: too early, then on time
        h.bridge.on_deadline(t0 + Duration::from_millis(50));
        assert_eq!(h.bus.published_on(topics::REGIONS_DRAW_SHAPE).len(), 1);
        h.bridge.on_deadline(t0 + Duration::from_millis(100));

        let draws = h.bus.published_on(topics::REGIONS_DRAW_SHAPE);
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[1], json!({"config_id": 3, "abort": true}));
        assert_eq!(h.bridge.next_deadline(), None);
    }

    #[test]
    fn test_add_annotation_without_comment_only_aborts() {
        let mut h = harness();
        let t0 = Instant::now();
        h.action("add_annotation", json!({}));

        h.deliver(
            topics::REGIONS_SHAPE_GENERATED,
            json!({"hist_id": 1, "shapes": ["1:1"]}),
            t0,
        );
        h.bridge.on_deadline(t0 + Duration::from_secs(1));

        assert!(h.bus.published_on(topics::REGIONS_MODIFY_SHAPES).is_empty());
        assert_eq!(h.bus.published_on(topics::REGIONS_DRAW_SHAPE).len(), 2);
    }

    #[test]
    fn test_new_draw_supersedes_pending_one() {
        // Arrange: a draw whose shape never arrives
        let mut h = harness();
        h.action("add_annotation", json!({"shapeComment": "first"}));
        let first = h.bus.subscriptions_on(topics::REGIONS_SHAPE_GENERATED);

        // Act
        h.action("add_annotation", json!({"shapeComment": "second"}));

        // Assert: one pending draw, on a fresh subscription
        assert_eq!(h.bridge.pending_draws(), 1);
        let live = h.bus.subscriptions_on(topics::REGIONS_SHAPE_GENERATED);
        assert_eq!(live.len(), 1);
        assert_ne!(live, first);
        assert!(h.bus.disposed().contains(&first[0]));
    }

    #[test]
    fn test_cancel_disposes_pending_draws() {
        let mut h = harness();
        h.action("add_annotation", json!({}));
        assert_eq!(h.bridge.pending_draws(), 1);

        h.action("cancel_annotation", json!(null));

        assert_eq!(h.bridge.pending_draws(), 0);
        assert!(h.bus.subscriptions_on(topics::REGIONS_SHAPE_GENERATED).is_empty());
    }

    // ── relay ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_relay_starts_at_host_initialized() {
        let mut h = harness();
        assert!(h.bus.subscriptions_on("IMAGE_SETTINGS_CHANGE").is_empty());

        h.host_initialized();
        h.deliver("IMAGE_SETTINGS_CHANGE", json!({"gamma": 1.2}), Instant::now());

        let relayed = h.host.posted_named("IMAGE_SETTINGS_CHANGE");
        assert_eq!(relayed.len(), 1);
        assert_eq!(relayed[0].params, Some(json!({"gamma": 1.2})));
        assert_eq!(h.bridge.stats().relayed, 1);
    }

    #[test]
    fn test_failed_relay_post_is_counted_not_fatal() {
        let mut h = harness();
        h.host_initialized();
        h.host.close();

        h.deliver("THUMBNAILS_UPDATE", json!({}), Instant::now());

        assert_eq!(h.bridge.stats().dropped_relay, 1);
        assert_eq!(h.bridge.state(), ConnectionState::HandshakeSent);
    }

    #[test]
    fn test_annotations_loaded_goes_to_parent() {
        let mut h = harness();
        h.deliver(
            topics::REGIONS_INFORMATION_RETRIEVED,
            json!({"shapes": ["1:1", "1:2"]}),
            Instant::now(),
        );

        let loaded = h.parent.posted_named("annotations_loaded");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].payload, Some(json!({"shapes": ["1:1", "1:2"]})));
    }

    // ── teardown ──────────────────────────────────────────────────────────────

    #[test]
    fn test_detach_disposes_everything() {
        // Arrange: connected with one draw pending
        let mut h = harness();
        h.host_initialized();
        h.viewer_initialized(1);
        h.action("add_annotation", json!({}));

        // Act
        h.bridge.detach();

        // Assert
        assert_eq!(h.bus.live_count(), 0);
        assert_eq!(h.bridge.state(), ConnectionState::Disconnected);
        assert_eq!(h.bridge.next_deadline(), None);
        assert!(!h.bridge.has_host());
    }

    #[test]
    fn test_drop_disposes_subscriptions() {
        let h = harness();
        let bus = h.bus.clone();
        assert_eq!(bus.live_count(), 2);

        drop(h);

        assert_eq!(bus.live_count(), 0);
    }

    #[test]
    fn test_relay_topic_count_after_connect() {
        let mut h = harness();
        h.host_initialized();
        // relay set plus the two attach-time subscriptions
        assert_eq!(h.bus.live_count(), RELAY_TOPICS.len() + 2);
    }
}
