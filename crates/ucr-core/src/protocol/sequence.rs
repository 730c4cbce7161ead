//! Sequence counter for outbound protocol messages.
//!
//! # What is the sequence number for?
//!
//! Every datagram the device sends carries a `seq` field.  The transport is
//! plain UDP, so peers use it to spot dropped or reordered pushes and to
//! discard a stale push that arrives after a newer one.  The device itself
//! never reads sequence numbers back.
//!
//! The counter is 32 bits wide, is never reset while the process runs, and
//! wraps from `u32::MAX` to 0.  The engine is single-threaded, so a plain
//! integer behind `&mut self` is enough; no atomics are involved.

/// Monotonically increasing (modulo 2³²) counter for outbound messages.
///
/// # Examples
///
/// ```rust
/// use ucr_core::protocol::SequenceCounter;
///
/// let mut counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    inner: u32,
}

impl SequenceCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number and advances the counter.
    ///
    /// Wraps from `u32::MAX` to 0 without panicking.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u32 {
        let value = self.inner;
        self.inner = self.inner.wrapping_add(1);
        value
    }

    /// Returns the value the next call to [`next`](Self::next) will hand out.
    pub fn current(&self) -> u32 {
        self.inner
    }
}
