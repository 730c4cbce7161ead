//! The protocol engine: one device, one tick at a time.
//!
//! # How a tick works
//!
//! ```text
//! tick()
//!  ├─ now = clock.now()                  -- one timestamp for the whole tick
//!  ├─ poll transport (at most one datagram)
//!  │    └─ decode → classify → dispatch → optional reply
//!  ├─ subscriber push if the interval elapsed, or inputs are dirty and the
//!  │  anti-flood floor elapsed
//!  └─ drop the subscriber if it has been silent for the timeout
//! ```
//!
//! The host program calls [`Engine::tick`] at a fixed cadence and writes
//! sensor readings through [`Engine::write_input`] in between.  When a bind
//! session is active every accepted input write is reported to the bind
//! endpoint immediately, outside the tick.
//!
//! The engine is single-threaded and never blocks: all methods take
//! `&mut self` and run to completion.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, trace, warn, Level};
use uuid::Uuid;

use crate::domain::channel::{Category, Direction, Value};
use crate::domain::registry::{DescriptorRegistry, RegistryError};
use crate::domain::session::SubscriberSession;
use crate::domain::store::IoStore;
use crate::protocol::codec::{DocumentCodec, MsgPackCodec};
use crate::protocol::messages::{DescriptorTable, OutboundDocument, Request, MAX_HOSTNAME_LEN};
use crate::protocol::sequence::SequenceCounter;
use crate::transport::Transport;

pub mod clock;
pub mod config;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;

/// What happened during one call to [`Engine::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A datagram was received and decoded.
    pub received: bool,
    /// A reply to that datagram was sent.
    pub replied: bool,
    /// An input snapshot was pushed to the subscriber.
    pub pushed: bool,
    /// The subscriber was dropped for silence.
    pub subscriber_timed_out: bool,
}

/// Device-side protocol engine.
///
/// Generic over the [`Transport`] it talks through, the [`DocumentCodec`]
/// that turns bytes into documents, and the [`Clock`] it reads time from.
pub struct Engine<T, C = MsgPackCodec, K = SystemClock> {
    transport: T,
    codec: C,
    clock: K,
    hostname: String,
    push_interval: Duration,
    anti_flood_floor: Duration,
    keep_alive: Duration,
    subscriber_timeout: Duration,
    registry: DescriptorRegistry,
    store: IoStore,
    session: SubscriberSession,
    sequence: SequenceCounter,
    rx_buf: Vec<u8>,
    last_tick: Option<Instant>,
}

impl<T: Transport> Engine<T> {
    /// Creates an engine that speaks MessagePack and reads the system clock.
    pub fn new(transport: T, config: EngineConfig) -> Self {
        Self::with_parts(transport, MsgPackCodec, SystemClock, config)
    }
}

impl<T, C, K> Engine<T, C, K>
where
    T: Transport,
    C: DocumentCodec,
    K: Clock,
{
    /// Creates an engine from explicit collaborators.
    pub fn with_parts(transport: T, codec: C, clock: K, config: EngineConfig) -> Self {
        let hostname = config
            .hostname
            .as_deref()
            .map(truncate_hostname)
            .unwrap_or_else(default_hostname);
        Self {
            transport,
            codec,
            clock,
            hostname,
            push_interval: config.push_interval,
            anti_flood_floor: config.anti_flood_floor,
            keep_alive: config.keep_alive,
            subscriber_timeout: config.subscriber_timeout,
            registry: DescriptorRegistry::new(config.layout),
            store: IoStore::new(config.layout),
            session: SubscriberSession::new(),
            sequence: SequenceCounter::new(),
            rx_buf: vec![0; config.receive_buffer_size.max(1)],
            last_tick: None,
        }
    }

    // ── Identity and tuning ──────────────────────────────────────────────────

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Renames the device.  Names longer than 31 bytes are cut.
    pub fn set_hostname(&mut self, name: &str) {
        self.hostname = truncate_hostname(name);
    }

    pub fn push_interval(&self) -> Duration {
        self.push_interval
    }

    /// Sets the unconditional push interval, also advertised to peers as the
    /// preferred rate in descriptor responses.
    pub fn set_push_interval(&mut self, interval: Duration) {
        self.push_interval = interval;
    }

    pub fn set_subscriber_timeout(&mut self, timeout: Duration) {
        self.subscriber_timeout = timeout;
    }

    // ── Channel registration ─────────────────────────────────────────────────

    /// Registers a channel at an explicit wire index.  Returns `None` if the
    /// index is out of range or taken.
    pub fn register_at(
        &mut self,
        direction: Direction,
        category: Category,
        name: &str,
        index: usize,
    ) -> Option<usize> {
        let assigned = self.registry.register_at(direction, category, name, index);
        if assigned.is_none() {
            debug!(%direction, %category, name, index, "channel registration ignored");
        }
        assigned
    }

    /// Registers a channel at the lowest free index.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CapacityExceeded`] when no slot is free.
    pub fn register(
        &mut self,
        direction: Direction,
        category: Category,
        name: &str,
    ) -> Result<usize, RegistryError> {
        self.registry.register(direction, category, name)
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    // ── Local I/O ────────────────────────────────────────────────────────────

    /// Updates an input channel.
    ///
    /// Out-of-range indices and unchanged values are ignored.  An accepted
    /// write marks inputs dirty and, while a bind session is active, is sent
    /// to the bind endpoint straight away.  Returns `true` if accepted.
    pub fn write_input(&mut self, category: Category, index: usize, value: impl Into<Value>) -> bool {
        if !self.store.write_input(category, index, value) {
            return false;
        }
        if let Some(bind) = self.session.bind_endpoint() {
            let now = self.clock.now();
            let value = self.store.read_input(category, index);
            let doc = OutboundDocument::bind_response(&self.hostname, category, index, value);
            self.send(bind, doc, now);
        }
        true
    }

    pub fn write_button(&mut self, index: usize, pressed: bool) -> bool {
        self.write_input(Category::Button, index, pressed)
    }

    pub fn write_axis(&mut self, index: usize, value: i16) -> bool {
        self.write_input(Category::Axis, index, value)
    }

    pub fn write_delta(&mut self, index: usize, value: i16) -> bool {
        self.write_input(Category::Delta, index, value)
    }

    pub fn write_event(&mut self, index: usize, fired: bool) -> bool {
        self.write_input(Category::Event, index, fired)
    }

    pub fn read_input(&self, category: Category, index: usize) -> Value {
        self.store.read_input(category, index)
    }

    /// Current output value, zero when `index` is out of range.
    pub fn read_output(&self, category: Category, index: usize) -> Value {
        self.store.read_output(category, index)
    }

    pub fn read_button(&self, index: usize) -> bool {
        self.read_output(Category::Button, index).to_raw(Category::Button) != 0
    }

    pub fn read_axis(&self, index: usize) -> i16 {
        self.read_output(Category::Axis, index).to_raw(Category::Axis)
    }

    pub fn read_delta(&self, index: usize) -> i16 {
        self.read_output(Category::Delta, index).to_raw(Category::Delta)
    }

    pub fn read_event(&self, index: usize) -> bool {
        self.read_output(Category::Event, index).to_raw(Category::Event) != 0
    }

    /// Zeroes every output, e.g. after the peer went away.
    pub fn reset_outputs(&mut self) {
        self.store.reset_outputs();
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    // ── Session ──────────────────────────────────────────────────────────────

    pub fn session(&self) -> &SubscriberSession {
        &self.session
    }

    /// Registers `peer` as subscriber without waiting for it to ask.
    ///
    /// The subscriber timeout counts from this call.
    pub fn set_subscriber(&mut self, peer: SocketAddr) {
        let now = self.clock.now();
        self.session.subscribe(peer);
        self.session.record_receive(now);
        info!(%peer, "subscriber set by host");
    }

    /// Pushes an input snapshot now, regardless of pacing.
    ///
    /// Returns `false` when there is no subscriber or the send failed.
    pub fn update_subscriber(&mut self) -> bool {
        let now = self.clock.now();
        self.push(now)
    }

    pub fn last_tick_at(&self) -> Option<Instant> {
        self.last_tick
    }

    pub fn last_receive_at(&self) -> Option<Instant> {
        self.session.last_receive_at()
    }

    pub fn last_send_at(&self) -> Option<Instant> {
        self.session.last_send_at()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Tick ─────────────────────────────────────────────────────────────────

    /// Runs one scheduling step.  Never fails: transport and codec problems
    /// are logged and the step carries on.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        self.last_tick = Some(now);
        self.session.forget_sends_before(now, self.keep_alive);
        let mut report = TickReport::default();

        self.receive(now, &mut report);

        if self.session.is_subscribed() {
            if self.push_due(now) {
                report.pushed = self.push(now);
            }
            if self.session.receive_timed_out(now, self.subscriber_timeout) {
                if let Some(peer) = self.session.unsubscribe() {
                    info!(%peer, timeout = ?self.subscriber_timeout, "subscriber silent too long, unsubscribing");
                }
                report.subscriber_timed_out = true;
            }
        }

        report
    }

    fn push_due(&self, now: Instant) -> bool {
        match self.session.since_subscriber_send(now) {
            None => true,
            Some(elapsed) => {
                elapsed >= self.push_interval
                    || (self.store.is_dirty() && elapsed >= self.anti_flood_floor)
            }
        }
    }

    fn receive(&mut self, now: Instant, report: &mut TickReport) {
        let (len, from) = match self.transport.poll(&mut self.rx_buf) {
            Ok(Some(datagram)) => datagram,
            Ok(None) => return,
            Err(e) => {
                warn!("transport poll failed: {e}");
                return;
            }
        };

        let doc = match self.codec.decode(&self.rx_buf[..len]) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(%from, len, "dropping undecodable datagram: {e}");
                return;
            }
        };
        trace_document("rx", from, &doc);

        self.session.record_receive(now);
        report.received = true;
        report.replied = self.dispatch(Request::from(&doc), from, now);
    }

    /// Applies one request and sends its reply, if it has one.  Returns
    /// `true` when a reply went out.
    fn dispatch(&mut self, request: Request, from: SocketAddr, now: Instant) -> bool {
        debug!(%from, ?request, "dispatching request");
        let reply = match request {
            Request::DescriptorListRequest => Some(self.descriptor_list()),
            Request::SetOutputs(batch) => {
                let applied = self.store.apply_outputs(batch.writes());
                debug!(%from, applied, total = batch.len(), "applied output batch");
                if self.session.sent_to_within(from, now, self.keep_alive) {
                    None
                } else {
                    Some(OutboundDocument::ack(&self.hostname))
                }
            }
            Request::SubscribeToInputs => {
                match self.session.subscribe(from) {
                    Some(previous) if previous != from => {
                        info!(%from, %previous, "subscriber replaced");
                    }
                    Some(_) => debug!(%from, "subscriber renewed"),
                    None => info!(%from, "subscriber registered"),
                }
                Some(OutboundDocument::ack(&self.hostname))
            }
            Request::UnsubscribeFromInputs => {
                if let Some(peer) = self.session.unsubscribe() {
                    info!(%peer, "subscriber unregistered");
                }
                Some(OutboundDocument::ack(&self.hostname))
            }
            Request::HeartbeatResponse => None,
            Request::BindStart => {
                self.session.start_bind(from);
                info!(%from, "bind session started");
                None
            }
            Request::BindStop => {
                if let Some(peer) = self.session.stop_bind() {
                    info!(%peer, "bind session stopped");
                }
                None
            }
            Request::HeartbeatRequest | Request::Other(_) => Some(OutboundDocument::ack(&self.hostname)),
        };

        match reply {
            Some(doc) => self.send(from, doc, now),
            None => false,
        }
    }

    fn descriptor_list(&self) -> OutboundDocument {
        let rate = u16::try_from(self.push_interval.as_millis()).unwrap_or(u16::MAX);
        OutboundDocument::descriptor_list(
            &self.hostname,
            rate,
            DescriptorTable::from_catalog(self.registry.catalog(Direction::Input)),
            DescriptorTable::from_catalog(self.registry.catalog(Direction::Output)),
        )
    }

    fn push(&mut self, now: Instant) -> bool {
        let Some(subscriber) = self.session.subscriber() else {
            return false;
        };
        let snapshot = self.store.snapshot_inputs(&self.registry);
        let doc = OutboundDocument::subscriber_update(&self.hostname, &snapshot);
        let sent = self.send(subscriber, doc, now);
        if sent {
            self.store.clear_dirty();
        }
        sent
    }

    /// Stamps a sequence number on `doc`, encodes it and sends it to `to`.
    fn send(&mut self, to: SocketAddr, mut doc: OutboundDocument, now: Instant) -> bool {
        doc.set_seq(self.sequence.next());
        let bytes = match self.codec.encode(&doc) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(kind = ?doc.kind(), "failed to encode outbound document: {e}");
                return false;
            }
        };
        trace_document("tx", to, &doc);

        self.session.record_send(to, now);
        match self.transport.send_to(&bytes, to) {
            Ok(()) => true,
            Err(e) => {
                warn!(%to, kind = ?doc.kind(), "send failed: {e}");
                false
            }
        }
    }
}

fn trace_document<D: Serialize>(direction: &str, peer: SocketAddr, doc: &D) {
    if !tracing::enabled!(Level::TRACE) {
        return;
    }
    match serde_json::to_string(doc) {
        Ok(json) => trace!(%peer, "{direction}: {json}"),
        Err(e) => trace!(%peer, "{direction}: <unrenderable document: {e}>"),
    }
}

/// `UCR_` followed by six hex digits of a random device id.
fn default_hostname() -> String {
    let id = Uuid::new_v4();
    let bytes = id.as_bytes();
    format!("UCR_{:02X}{:02X}{:02X}", bytes[0], bytes[1], bytes[2])
}

fn truncate_hostname(name: &str) -> String {
    let mut end = name.len().min(MAX_HOSTNAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::ProtocolError;
    use crate::transport::loopback::LoopbackTransport;
    use crate::transport::{MockTransport, TransportError};
    use serde_json::{json, Value as Json};

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([192, 168, 4, 2], port))
    }

    fn request(doc: Json) -> Vec<u8> {
        rmp_serde::to_vec_named(&doc).expect("encode request")
    }

    fn decode(bytes: &[u8]) -> Json {
        rmp_serde::from_slice(bytes).expect("decode sent document")
    }

    fn loopback_engine() -> (Engine<LoopbackTransport, MsgPackCodec, ManualClock>, LoopbackTransport, ManualClock) {
        let transport = LoopbackTransport::new();
        let clock = ManualClock::new();
        let config = EngineConfig {
            hostname: Some("test-pad".to_string()),
            ..Default::default()
        };
        let engine = Engine::with_parts(transport.clone(), MsgPackCodec, clock.clone(), config);
        (engine, transport, clock)
    }

    /// Mock transport that yields `datagram` once and then reports no traffic.
    fn mock_with_datagram(datagram: Vec<u8>, from: SocketAddr) -> MockTransport {
        let mut mock = MockTransport::new();
        let mut pending = Some(datagram);
        mock.expect_poll().returning(move |buf| {
            Ok(pending.take().map(|bytes| {
                buf[..bytes.len()].copy_from_slice(&bytes);
                (bytes.len(), from)
            }))
        });
        mock
    }

    #[test]
    fn test_default_hostname_has_device_id_suffix() {
        let name = default_hostname();
        assert!(name.starts_with("UCR_"));
        assert_eq!(name.len(), 10);
        assert!(name[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hostname_is_truncated_on_char_boundary() {
        let long = "é".repeat(20); // 40 bytes
        let truncated = truncate_hostname(&long);
        assert!(truncated.len() <= MAX_HOSTNAME_LEN);
        assert_eq!(truncated, "é".repeat(15));
    }

    #[test]
    fn test_undecodable_datagram_is_dropped_without_reply() {
        // Arrange
        let mut transport = mock_with_datagram(vec![0xc1, 0xc1], peer(5000));
        transport.expect_send_to().never();
        let mut engine = Engine::with_parts(transport, MsgPackCodec, ManualClock::new(), EngineConfig::default());

        // Act
        let report = engine.tick();

        // Assert
        assert_eq!(report, TickReport::default());
        assert_eq!(engine.last_receive_at(), None);
    }

    #[test]
    fn test_heartbeat_response_is_terminal() {
        // Arrange
        let mut transport = mock_with_datagram(request(json!({ "MsgType": 1 })), peer(5000));
        transport.expect_send_to().never();
        let mut engine = Engine::with_parts(transport, MsgPackCodec, ManualClock::new(), EngineConfig::default());

        // Act
        let report = engine.tick();

        // Assert
        assert!(report.received);
        assert!(!report.replied);
        assert!(engine.last_receive_at().is_some());
    }

    #[test]
    fn test_bind_start_and_stop_send_nothing() {
        // Arrange
        let mut transport = MockTransport::new();
        let mut queue = vec![
            request(json!({ "MsgType": 9 })),
            request(json!({ "MsgType": 8 })),
        ];
        transport.expect_poll().returning(move |buf| {
            Ok(queue.pop().map(|bytes| {
                buf[..bytes.len()].copy_from_slice(&bytes);
                (bytes.len(), peer(7000))
            }))
        });
        transport.expect_send_to().never();
        let mut engine = Engine::with_parts(transport, MsgPackCodec, ManualClock::new(), EngineConfig::default());

        // Act / Assert
        engine.tick();
        assert_eq!(engine.session().bind_endpoint(), Some(peer(7000)));
        engine.tick();
        assert!(!engine.session().is_bind_active());
    }

    #[test]
    fn test_failed_push_keeps_inputs_dirty() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_poll().returning(|_| Ok(None));
        transport
            .expect_send_to()
            .times(1)
            .returning(|_, _| Err(TransportError::Io(std::io::Error::other("network down"))));
        let mut engine = Engine::with_parts(transport, MsgPackCodec, ManualClock::new(), EngineConfig::default());
        engine.register(Direction::Input, Category::Button, "jump").unwrap();
        engine.set_subscriber(peer(5000));
        engine.write_button(0, true);

        // Act
        let report = engine.tick();

        // Assert
        assert!(!report.pushed);
        assert!(engine.is_dirty());
    }

    #[test]
    fn test_poll_error_is_not_fatal() {
        let mut transport = MockTransport::new();
        transport
            .expect_poll()
            .returning(|_| Err(TransportError::Io(std::io::Error::other("boom"))));
        transport.expect_send_to().never();
        let mut engine = Engine::with_parts(transport, MsgPackCodec, ManualClock::new(), EngineConfig::default());

        let report = engine.tick();

        assert!(!report.received);
        assert!(engine.last_tick_at().is_some());
    }

    #[test]
    fn test_unknown_and_unset_kinds_are_acknowledged() {
        // Arrange
        let (mut engine, transport, _clock) = loopback_engine();
        transport.inject(request(json!({ "MsgType": 99 })), peer(5000));
        transport.inject(request(json!({ "hello": true })), peer(5001));

        // Act
        engine.tick();
        engine.tick();

        // Assert
        let sent = transport.take_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(decode(&sent[0].payload), json!({ "hostname": "test-pad", "MsgType": 1, "seq": 0 }));
        assert_eq!(sent[1].to, peer(5001));
        assert_eq!(decode(&sent[1].payload)["seq"], 1);
    }

    #[test]
    fn test_descriptor_request_advertises_push_interval() {
        // Arrange
        let (mut engine, transport, _clock) = loopback_engine();
        engine.set_push_interval(Duration::from_millis(50));
        transport.inject(request(json!({ "MsgType": 2 })), peer(5000));

        // Act
        engine.tick();

        // Assert
        let sent = transport.take_sent();
        let doc = decode(&sent[0].payload);
        assert_eq!(doc["MsgType"], 3);
        assert_eq!(doc["rate"], 50);
        assert_eq!(doc["hostname"], "test-pad");
    }

    #[test]
    fn test_set_outputs_updates_output_store() {
        // Arrange
        let (mut engine, transport, _clock) = loopback_engine();
        transport.inject(
            request(json!({
                "MsgType": 4,
                "b": [{ "Index": 3, "Value": true }],
                "a": [{ "Index": 0, "Value": -250 }],
                "e": [{ "Index": 99, "Value": true }],
            })),
            peer(5000),
        );

        // Act
        let report = engine.tick();

        // Assert
        assert!(report.replied, "first contact is acknowledged");
        assert!(engine.read_button(3));
        assert_eq!(engine.read_axis(0), -250);
        assert!(!engine.read_event(31));
    }

    #[test]
    fn test_reset_outputs_clears_values_written_by_peer() {
        let (mut engine, transport, _clock) = loopback_engine();
        transport.inject(
            request(json!({ "MsgType": 4, "d": [{ "Index": 1, "Value": 12 }] })),
            peer(5000),
        );
        engine.tick();

        engine.reset_outputs();

        assert_eq!(engine.read_delta(1), 0);
    }

    #[test]
    fn test_update_subscriber_without_subscriber_returns_false() {
        let (mut engine, transport, _clock) = loopback_engine();

        assert!(!engine.update_subscriber());
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_encode_failure_is_reported_as_not_sent() {
        struct BrokenEncoder;
        impl DocumentCodec for BrokenEncoder {
            fn decode(&self, bytes: &[u8]) -> Result<crate::protocol::InboundDocument, ProtocolError> {
                MsgPackCodec.decode(bytes)
            }
            fn encode(&self, _: &OutboundDocument) -> Result<Vec<u8>, ProtocolError> {
                Err(ProtocolError::Encode("unsupported".into()))
            }
        }

        let transport = LoopbackTransport::new();
        let mut engine = Engine::with_parts(transport.clone(), BrokenEncoder, ManualClock::new(), EngineConfig::default());
        engine.set_subscriber(peer(5000));

        assert!(!engine.update_subscriber());
        assert!(transport.sent().is_empty());
    }
}
