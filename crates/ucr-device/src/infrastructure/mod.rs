//! Infrastructure layer for the device binary.
//!
//! Contains OS-facing adapters: the UDP socket and file-system storage.
//!
//! **Dependency rule**: this layer may depend on `ucr_core`, but MUST NOT be
//! imported by `ucr_core`.

pub mod network;
pub mod storage;
