//! Protocol module containing the envelope, the inbound filter and the
//! correlation counter.

pub mod auth;
pub mod envelope;
pub mod sequence;

pub use auth::ChannelAuthenticator;
pub use envelope::{host_events, Envelope, EnvelopeError, MessageKind, DEFAULT_CONTEXT_TAG};
pub use sequence::CorrelationCounter;
