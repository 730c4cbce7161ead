//! UDP transport for the engine.
//!
//! The engine polls once per tick and must never block, so the socket is
//! switched to non-blocking mode right after binding.  A `recv_from` that
//! would block is reported to the engine as "nothing pending".
//!
//! # Lost datagrams
//!
//! Only one datagram is read per tick.  If the controller sends faster than
//! the device ticks, the kernel receive buffer absorbs the burst and drops
//! the overflow.  UDP peers are expected to tolerate that.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use thiserror::Error;
use tracing::info;
use ucr_core::{Transport, TransportError};

/// Error type for socket setup.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The UDP socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The socket could not be switched to non-blocking mode.
    #[error("failed to configure UDP socket: {0}")]
    Configure(#[source] std::io::Error),
}

/// A non-blocking UDP socket implementing [`Transport`].
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Binds `addr` and switches the socket to non-blocking mode.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if the address is unavailable and
    /// [`NetworkError::Configure`] if non-blocking mode cannot be set.
    pub fn bind(addr: SocketAddr) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind(addr).map_err(|source| NetworkError::BindFailed { addr, source })?;
        socket.set_nonblocking(true).map_err(NetworkError::Configure)?;
        let transport = Self { socket };
        if let Ok(local) = transport.local_addr() {
            info!("listening on UDP {local}");
        }
        Ok(transport)
    }

    /// The address actually bound, useful when binding port 0.
    ///
    /// # Errors
    ///
    /// Propagates the OS error from `getsockname`.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    fn poll(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, TransportError> {
        match self.socket.recv_from(buf) {
            Ok(datagram) => Ok(Some(datagram)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            // Windows reports an ICMP port-unreachable from an earlier send
            // on the next receive.
            Err(e) if e.kind() == ErrorKind::ConnectionReset => Ok(None),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn send_to(&mut self, payload: &[u8], peer: SocketAddr) -> Result<(), TransportError> {
        self.socket.send_to(payload, peer)?;
        Ok(())
    }
}
