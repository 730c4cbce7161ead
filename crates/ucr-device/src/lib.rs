//! ucr-device library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does ucr-device do?
//!
//! `ucr-core` is a socket-free engine.  This crate puts it on the network:
//!
//! 1. Loads a TOML file describing the device name, UDP port, timing and the
//!    channels the device exposes.
//! 2. Binds a non-blocking UDP socket and wraps it as a `Transport`.
//! 3. Registers the configured channels with the engine.
//! 4. Calls `Engine::tick` at a fixed cadence until Ctrl-C.

/// Application layer: turning configuration into a ready engine.
pub mod application;

/// Infrastructure layer: UDP socket and configuration file.
pub mod infrastructure;
