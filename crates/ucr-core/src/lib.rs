//! # ucr-core
//!
//! Device-side engine for UCR remote I/O: a small device (a game pad, a
//! sensor box, a panel of switches) exposes named input and output channels
//! and a remote controller reads and drives them over UDP.
//!
//! This crate has no dependency on sockets, threads or an async runtime.
//! The host program owns the scheduling loop and hands the engine a
//! [`Transport`](transport::Transport) to talk through.
//!
//! # Architecture overview
//!
//! - **`domain`** – Channels and their values.  The
//!   [`DescriptorRegistry`](domain::registry::DescriptorRegistry) names the
//!   slots a device exposes, the [`IoStore`](domain::store::IoStore) holds
//!   their current values, and the
//!   [`SubscriberSession`](domain::session::SubscriberSession) remembers who
//!   is listening.
//!
//! - **`protocol`** – The documents exchanged with the controller, one per
//!   datagram, MessagePack encoded.  Requests are classified into
//!   [`Request`](protocol::Request) variants; replies are built as
//!   [`OutboundDocument`](protocol::OutboundDocument)s.
//!
//! - **`transport`** – The datagram seam.  Real sockets live in the device
//!   binary; [`LoopbackTransport`](transport::loopback::LoopbackTransport)
//!   serves tests.
//!
//! - **`engine`** – [`Engine::tick`] ties it together: receive at most one
//!   datagram, answer it, push inputs to the subscriber on schedule, and
//!   expire a silent subscriber.
//!
//! # Example
//!
//! ```
//! use ucr_core::{Category, Direction, Engine, EngineConfig};
//! use ucr_core::transport::loopback::LoopbackTransport;
//!
//! let mut engine = Engine::new(LoopbackTransport::new(), EngineConfig::default());
//! engine.register(Direction::Input, Category::Button, "fire").unwrap();
//! engine.write_button(0, true);
//! let report = engine.tick();
//! assert!(!report.pushed); // nobody has subscribed yet
//! ```

pub mod domain;
pub mod engine;
pub mod protocol;
pub mod transport;

pub use domain::channel::{Capacities, Category, ChannelLayout, Direction, Value};
pub use domain::registry::{Descriptor, DescriptorRegistry, RegistryError};
pub use domain::session::SubscriberSession;
pub use domain::store::{InputSnapshot, IoStore};
pub use engine::{Clock, Engine, EngineConfig, ManualClock, SystemClock, TickReport};
pub use protocol::{DocumentCodec, MessageKind, MsgPackCodec, OutboundDocument, ProtocolError, Request};
pub use transport::{Transport, TransportError};
