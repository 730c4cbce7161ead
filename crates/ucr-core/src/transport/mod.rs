//! Datagram transport seam.
//!
//! The engine polls a [`Transport`] for at most one datagram per tick and
//! sends replies through it.  The real UDP adapter lives in the device
//! binary; tests use [`loopback::LoopbackTransport`] or a `mockall` mock.
//!
//! # Non-blocking contract
//!
//! [`Transport::poll`] must return immediately.  `Ok(None)` means nothing is
//! queued.  Datagrams that overflow whatever buffer sits below the transport
//! are lost without notice; the protocol tolerates that.

use std::net::SocketAddr;

use thiserror::Error;

pub mod loopback;

/// Errors reported by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying socket reported an I/O error.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A non-blocking, connectionless datagram endpoint.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Copies the next pending datagram into `buf`.
    ///
    /// Returns the datagram length and sender, or `None` when nothing is
    /// pending.  Datagrams longer than `buf` are truncated.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] on socket failures.
    fn poll(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, TransportError>;

    /// Sends one datagram to `peer`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] on socket failures.
    fn send_to(&mut self, payload: &[u8], peer: SocketAddr) -> Result<(), TransportError>;
}
