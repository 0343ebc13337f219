//! The message envelope exchanged with the host window.
//!
//! Every message crossing the frame boundary, in either direction, is a JSON
//! object of this shape:
//!
//! ```json
//! {"context":"clovid_integration","type":"action","name":"zoom_to_fit"}
//! {"context":"clovid_integration","type":"event","name":"handshake",
//!  "params":{"iviewerid":"0a1b2c3d4e5f60718293","vqvpid":"vp-7"}}
//! ```
//!
//! `type` selects between notifications (`"event"`) and commands
//! (`"action"`).  `params` carries routing metadata, `payload` carries the
//! command arguments.  `target` addresses one embedded instance when the host
//! talks to several at once.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The protocol tag both sides present on every message.
///
/// This is a namespace filter that keeps unrelated `postMessage` traffic out
/// of the bridge.  It is a well-known constant and grants no authority.
pub const DEFAULT_CONTEXT_TAG: &str = "clovid_integration";

/// Event names the bridge itself exchanges with the host.
pub mod host_events {
    /// Viewer → parent: announces the session token, sent once at attach.
    pub const HANDSHAKE: &str = "handshake";
    /// Host → viewer: the host is ready.  Viewer → host: both sides are ready.
    pub const INITIALIZED: &str = "initialized";
    /// Viewer → parent: the region list for the current image has loaded.
    pub const ANNOTATIONS_LOADED: &str = "annotations_loaded";
}

/// Errors produced while reading an envelope off the wire.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The text was not valid JSON or did not have the envelope shape.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Discriminates notifications from commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A notification.  Also the legacy channel for a handful of commands.
    Event,
    /// A command the receiver should act on.
    Action,
    /// Any other value.  Tolerated on input so newer hosts do not break the
    /// parse; never produced on output.
    #[serde(other)]
    Unknown,
}

impl MessageKind {
    /// Wire spelling of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Event => "event",
            MessageKind::Action => "action",
            MessageKind::Unknown => "unknown",
        }
    }
}

/// One message on the cross-window channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol tag; must equal the receiver's configured tag.
    pub context: String,

    /// `"event"` or `"action"`.
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Message name, e.g. `"initialized"` or `"add_annotation"`.
    pub name: String,

    /// Routing metadata such as the sender's instance id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Command arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Session token of the embedded instance this message is addressed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Envelope {
    /// Builds an `"event"` envelope with no params or payload.
    pub fn event(context: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            kind: MessageKind::Event,
            name: name.into(),
            params: None,
            payload: None,
            target: None,
        }
    }

    /// Builds an `"action"` envelope with no params or payload.
    pub fn action(context: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Action,
            ..Self::event(context, name)
        }
    }

    /// Sets `params`.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Sets `payload`.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets `target`.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Parses an envelope from a JSON value that has already been
    /// authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] if a required field is missing or
    /// has the wrong type.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serializes the envelope to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] if a `params`/`payload` value
    /// cannot be serialized (for example a map with non-string keys).
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
