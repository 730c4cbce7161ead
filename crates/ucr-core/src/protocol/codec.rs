//! Document codec for UCR datagrams.
//!
//! The engine never looks at bytes directly: it hands inbound datagrams to a
//! [`DocumentCodec`] and gets [`InboundDocument`]s back, and hands
//! [`OutboundDocument`]s to the same codec to get bytes to send.  The shipped
//! implementation, [`MsgPackCodec`], speaks MessagePack with string-keyed maps,
//! which is what existing peers expect.

use thiserror::Error;

use crate::protocol::messages::{InboundDocument, OutboundDocument};

/// Errors that can occur during document encoding or decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The datagram is not a well-formed document.
    #[error("malformed document: {0}")]
    Decode(String),

    /// The document could not be serialised.
    #[error("failed to encode document: {0}")]
    Encode(String),
}

/// Encode/decode boundary between raw datagrams and documents.
pub trait DocumentCodec {
    /// Parses one datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] if `bytes` is not a document.
    fn decode(&self, bytes: &[u8]) -> Result<InboundDocument, ProtocolError>;

    /// Serialises one outbound document.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialisation fails.
    fn encode(&self, document: &OutboundDocument) -> Result<Vec<u8>, ProtocolError>;
}

/// MessagePack codec.  Structs are written as maps keyed by field name.
///
/// # Examples
///
/// ```rust
/// use ucr_core::protocol::{DocumentCodec, MsgPackCodec, OutboundDocument};
///
/// let codec = MsgPackCodec;
/// let bytes = codec.encode(&OutboundDocument::ack("UCR_0A1B2C")).unwrap();
/// assert!(!bytes.is_empty());
/// assert!(codec.decode(&[0xc1]).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl DocumentCodec for MsgPackCodec {
    fn decode(&self, bytes: &[u8]) -> Result<InboundDocument, ProtocolError> {
        rmp_serde::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }

    fn encode(&self, document: &OutboundDocument) -> Result<Vec<u8>, ProtocolError> {
        rmp_serde::to_vec_named(document).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
