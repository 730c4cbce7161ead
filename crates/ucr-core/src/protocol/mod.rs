//! Protocol module containing message kinds, wire documents and the codec.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{DocumentCodec, MsgPackCodec, ProtocolError};
pub use messages::*;
pub use sequence::SequenceCounter;
