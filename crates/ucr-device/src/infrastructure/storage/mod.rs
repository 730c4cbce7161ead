//! File-system storage for the device.

pub mod config;
