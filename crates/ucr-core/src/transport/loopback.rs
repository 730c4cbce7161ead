//! In-memory transport for tests and simulations.
//!
//! Lets tests inject inbound datagrams as if they came off the wire and
//! inspect everything the engine sent, without opening a socket.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::rc::Rc;

use super::{Transport, TransportError};

/// A datagram captured by [`LoopbackTransport::send_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub to: SocketAddr,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    inbound: VecDeque<(Vec<u8>, SocketAddr)>,
    sent: Vec<SentDatagram>,
}

/// A [`Transport`] backed by in-memory queues.
///
/// Clones share the same queues, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct LoopbackTransport {
    inner: Rc<RefCell<Inner>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a datagram as if `from` had sent it.
    pub fn inject(&self, payload: impl Into<Vec<u8>>, from: SocketAddr) {
        self.inner
            .borrow_mut()
            .inbound
            .push_back((payload.into(), from));
    }

    /// Number of injected datagrams not yet polled.
    pub fn pending(&self) -> usize {
        self.inner.borrow().inbound.len()
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.inner.borrow().sent.clone()
    }

    /// Drains and returns everything sent so far.
    pub fn take_sent(&self) -> Vec<SentDatagram> {
        std::mem::take(&mut self.inner.borrow_mut().sent)
    }
}

impl Transport for LoopbackTransport {
    fn poll(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, TransportError> {
        let Some((payload, from)) = self.inner.borrow_mut().inbound.pop_front() else {
            return Ok(None);
        };
        let len = payload.len().min(buf.len());
        buf[..len].copy_from_slice(&payload[..len]);
        Ok(Some((len, from)))
    }

    fn send_to(&mut self, payload: &[u8], peer: SocketAddr) -> Result<(), TransportError> {
        self.inner.borrow_mut().sent.push(SentDatagram {
            to: peer,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
