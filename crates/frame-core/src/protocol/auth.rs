//! Inbound message filtering.
//!
//! The host page may be embedding several viewers at once and relays the same
//! `postMessage` traffic to all of them, alongside whatever else happens to be
//! posted to the window.  [`ChannelAuthenticator`] decides, from the raw JSON
//! value, whether a message belongs to this protocol *and* to this instance.
//!
//! Filtering happens on the raw [`serde_json::Value`] rather than on a parsed
//! [`Envelope`](crate::protocol::Envelope) so that foreign messages of any
//! shape are dropped without ever reaching the envelope parser.

use serde_json::Value;
use tracing::trace;

use crate::session::SessionToken;

/// Accepts messages that carry the protocol tag and are addressed to us.
#[derive(Debug, Clone)]
pub struct ChannelAuthenticator {
    context_tag: String,
    session: SessionToken,
}

impl ChannelAuthenticator {
    /// Creates an authenticator for one embedded instance.
    pub fn new(context_tag: impl Into<String>, session: SessionToken) -> Self {
        Self {
            context_tag: context_tag.into(),
            session,
        }
    }

    /// The tag this authenticator expects in `context`.
    pub fn context_tag(&self) -> &str {
        &self.context_tag
    }

    /// Returns `true` only if `message` is an object whose `context` equals
    /// the protocol tag and whose `target`, when present, equals this
    /// instance's session token.
    ///
    /// A `null` target counts as absent.  Rejections are silent.
    pub fn accept(&self, message: &Value) -> bool {
        let Some(obj) = message.as_object() else {
            trace!("dropping non-object message");
            return false;
        };

        match obj.get("context").and_then(Value::as_str) {
            Some(ctx) if ctx == self.context_tag => {}
            Some(_) => {
                trace!("dropping message with foreign context tag");
                return false;
            }
            None => {
                trace!("dropping message without context tag");
                return false;
            }
        }

        match obj.get("target") {
            None | Some(Value::Null) => true,
            Some(Value::String(target)) if target == self.session.as_str() => true,
            Some(_) => {
                trace!("dropping message addressed to another instance");
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
