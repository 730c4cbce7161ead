//! Subscriber session: who receives pushes, who receives bind notifications,
//! and when we last talked to them.
//!
//! # Two endpoint slots
//!
//! The push subscription and the bind (diagnostic) session each keep their
//! own endpoint.  A peer starting a bind session never redirects pushes, and
//! unsubscribing never ends a bind session.
//!
//! # Last writer wins
//!
//! There is exactly one subscriber.  A new `SUBSCRIBE_TO_INPUTS` replaces the
//! previous subscriber without telling it; the same holds for `BIND_START`.
//!
//! # Send bookkeeping
//!
//! The session remembers when each destination was last sent a datagram, so
//! that acknowledgement suppression is decided per peer.  Entries older than
//! the keep-alive window carry no information and are dropped by
//! [`SubscriberSession::forget_sends_before`].
//!
//! Push pacing is measured against a separate timestamp for the current
//! subscriber, reset whenever the subscriber changes, so that a busy bind
//! session on another endpoint cannot hold subscriber pushes back.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Endpoints and timestamps of the single remote session.
#[derive(Debug, Clone, Default)]
pub struct SubscriberSession {
    subscriber: Option<SocketAddr>,
    bind_endpoint: Option<SocketAddr>,
    last_send: Option<Instant>,
    sent_to: HashMap<SocketAddr, Instant>,
    subscriber_last_send: Option<Instant>,
    last_receive: Option<Instant>,
}

impl SubscriberSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `peer` the push target.  Returns the displaced subscriber, if any.
    pub fn subscribe(&mut self, peer: SocketAddr) -> Option<SocketAddr> {
        let previous = self.subscriber.replace(peer);
        if previous != Some(peer) {
            self.subscriber_last_send = None;
        }
        previous
    }

    /// Drops the push subscription.  Returns the endpoint that was subscribed.
    pub fn unsubscribe(&mut self) -> Option<SocketAddr> {
        self.subscriber_last_send = None;
        self.subscriber.take()
    }

    pub fn subscriber(&self) -> Option<SocketAddr> {
        self.subscriber
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriber.is_some()
    }

    /// Makes `peer` the bind notification target.  Returns the displaced one.
    pub fn start_bind(&mut self, peer: SocketAddr) -> Option<SocketAddr> {
        self.bind_endpoint.replace(peer)
    }

    pub fn stop_bind(&mut self) -> Option<SocketAddr> {
        self.bind_endpoint.take()
    }

    pub fn bind_endpoint(&self) -> Option<SocketAddr> {
        self.bind_endpoint
    }

    pub fn is_bind_active(&self) -> bool {
        self.bind_endpoint.is_some()
    }

    pub fn record_send(&mut self, to: SocketAddr, at: Instant) {
        self.last_send = Some(at);
        self.sent_to.insert(to, at);
        if self.subscriber == Some(to) {
            self.subscriber_last_send = Some(at);
        }
    }

    pub fn record_receive(&mut self, at: Instant) {
        self.last_receive = Some(at);
    }

    /// When anything was last sent, to anyone.
    pub fn last_send_at(&self) -> Option<Instant> {
        self.last_send
    }

    pub fn last_receive_at(&self) -> Option<Instant> {
        self.last_receive
    }

    /// Time since the last datagram sent to the current subscriber, `None`
    /// if there is no subscriber or it has not been sent anything yet.
    pub fn since_subscriber_send(&self, now: Instant) -> Option<Duration> {
        self.subscriber_last_send
            .map(|at| now.saturating_duration_since(at))
    }

    /// When `peer` was last sent a datagram, unless that record was forgotten.
    pub fn last_send_to(&self, peer: SocketAddr) -> Option<Instant> {
        self.sent_to.get(&peer).copied()
    }

    /// Drops per-destination send records older than `window` before `now`.
    pub fn forget_sends_before(&mut self, now: Instant, window: Duration) {
        self.sent_to
            .retain(|_, at| now.saturating_duration_since(*at) < window);
    }

    /// `true` when `peer` was sent a datagram less than `window` before `now`.
    pub fn sent_to_within(&self, peer: SocketAddr, now: Instant, window: Duration) -> bool {
        self.last_send_to(peer)
            .is_some_and(|at| now.saturating_duration_since(at) < window)
    }

    /// `true` when nothing has been received for at least `timeout`.
    ///
    /// A session that never received anything counts as timed out.
    pub fn receive_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        match self.last_receive {
            Some(at) => now.saturating_duration_since(at) >= timeout,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([192, 168, 1, 20], port))
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = SubscriberSession::new();
        assert!(!session.is_subscribed());
        assert!(!session.is_bind_active());
        assert_eq!(session.last_send_at(), None);
    }

    #[test]
    fn test_subscribe_replaces_previous_subscriber() {
        // Arrange
        let mut session = SubscriberSession::new();
        session.subscribe(addr(1000));

        // Act
        let displaced = session.subscribe(addr(2000));

        // Assert
        assert_eq!(displaced, Some(addr(1000)));
        assert_eq!(session.subscriber(), Some(addr(2000)));
    }

    #[test]
    fn test_bind_and_subscription_have_independent_endpoints() {
        // Arrange
        let mut session = SubscriberSession::new();
        session.subscribe(addr(1000));

        // Act
        session.start_bind(addr(3000));

        // Assert
        assert_eq!(session.subscriber(), Some(addr(1000)));
        assert_eq!(session.bind_endpoint(), Some(addr(3000)));

        session.unsubscribe();
        assert!(session.is_bind_active());
        session.stop_bind();
        assert!(!session.is_bind_active());
    }

    #[test]
    fn test_sent_to_within_requires_matching_peer_and_window() {
        // Arrange
        let mut session = SubscriberSession::new();
        let t0 = Instant::now();
        session.record_send(addr(1000), t0);
        let window = Duration::from_secs(10);

        // Act / Assert
        assert!(session.sent_to_within(addr(1000), t0 + Duration::from_secs(9), window));
        assert!(!session.sent_to_within(addr(1000), t0 + Duration::from_secs(10), window));
        assert!(!session.sent_to_within(addr(2000), t0, window));
    }

    #[test]
    fn test_receive_timed_out_boundary_is_inclusive() {
        // Arrange
        let mut session = SubscriberSession::new();
        let t0 = Instant::now();
        session.record_receive(t0);
        let timeout = Duration::from_millis(300);

        // Act / Assert
        assert!(!session.receive_timed_out(t0 + Duration::from_millis(299), timeout));
        assert!(session.receive_timed_out(t0 + Duration::from_millis(300), timeout));
    }

    #[test]
    fn test_since_subscriber_send_ignores_other_endpoints() {
        // Arrange
        let mut session = SubscriberSession::new();
        let t0 = Instant::now();
        session.subscribe(addr(1000));
        session.record_send(addr(1000), t0);

        // Act – a later send to the bind endpoint
        session.record_send(addr(3000), t0 + Duration::from_millis(4));

        // Assert
        assert_eq!(
            session.since_subscriber_send(t0 + Duration::from_millis(7)),
            Some(Duration::from_millis(7))
        );
        assert_eq!(session.last_send_at(), Some(t0 + Duration::from_millis(4)));
    }

    #[test]
    fn test_send_history_is_kept_per_destination() {
        // Arrange
        let mut session = SubscriberSession::new();
        let t0 = Instant::now();
        let window = Duration::from_secs(10);
        session.subscribe(addr(1000));
        session.record_send(addr(2000), t0);

        // Act – later traffic to the subscriber and the bind endpoint
        session.record_send(addr(1000), t0 + Duration::from_millis(20));
        session.start_bind(addr(3000));
        session.record_send(addr(3000), t0 + Duration::from_millis(30));

        // Assert
        assert_eq!(session.last_send_to(addr(2000)), Some(t0));
        assert!(session.sent_to_within(addr(2000), t0 + Duration::from_millis(40), window));
        assert!(session.sent_to_within(addr(1000), t0 + Duration::from_millis(40), window));
    }

    #[test]
    fn test_forget_sends_before_drops_only_stale_records() {
        let mut session = SubscriberSession::new();
        let t0 = Instant::now();
        session.record_send(addr(2000), t0);
        session.record_send(addr(2001), t0 + Duration::from_secs(5));

        session.forget_sends_before(t0 + Duration::from_secs(10), Duration::from_secs(10));

        assert_eq!(session.last_send_to(addr(2000)), None);
        assert_eq!(session.last_send_to(addr(2001)), Some(t0 + Duration::from_secs(5)));
        assert_eq!(session.last_send_at(), Some(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_new_subscriber_starts_without_send_history() {
        let mut session = SubscriberSession::new();
        let t0 = Instant::now();
        session.subscribe(addr(1000));
        session.record_send(addr(1000), t0);

        session.subscribe(addr(2000));

        assert_eq!(session.since_subscriber_send(t0), None);
    }
}
