//! Application layer use cases for the device binary.
//!
//! Use cases in this layer orchestrate the engine from `ucr_core`; they do no
//! socket or file I/O of their own, so they can be driven by the in-memory
//! transport in tests.
//!
//! # Sub-modules
//!
//! - **`configure_engine`** – Turns a loaded `DeviceConfig` into an engine
//!   with its channels registered.
//!
//! - **`run_device`** – The fixed-cadence tick loop, stopped by a shutdown
//!   future such as Ctrl-C.

pub mod configure_engine;
pub mod run_device;
