//! Domain model: channels, their descriptors and values, and the remote session.
//!
//! Nothing in here touches the network or the clock; the engine passes
//! timestamps in explicitly so every decision is reproducible in tests.

pub mod channel;
pub mod registry;
pub mod session;
pub mod store;
