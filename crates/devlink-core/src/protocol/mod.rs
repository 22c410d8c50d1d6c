//! Protocol module containing the topic grammar, wire message types, and the codec.

pub mod codec;
pub mod messages;
pub mod topics;

pub use codec::{Codec, ProtocolError};
pub use messages::{Payload, WireMessage};
pub use topics::InboundKind;
