//! Engine tuning: timing windows, slot capacities and device identity.

use std::time::Duration;

use crate::domain::channel::ChannelLayout;

/// Minimum spacing between two dirty-triggered pushes.
pub const ANTI_FLOOD_FLOOR: Duration = Duration::from_millis(5);

/// After sending anything to a peer, `SET_OUTPUTS` from that peer is not
/// acknowledged for this long.
pub const KEEP_ALIVE_WINDOW: Duration = Duration::from_secs(10);

/// Silence from the subscriber after which the subscription is dropped.
pub const DEFAULT_SUBSCRIBER_TIMEOUT: Duration = Duration::from_secs(300);

/// Interval between unconditional pushes to the subscriber.
pub const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_millis(20);

/// Size of the receive buffer; longer datagrams are truncated and will fail
/// to decode.
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 512;

/// Construction-time settings for an [`Engine`](super::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name reported in every outbound document.  `None` derives a
    /// `UCR_XXXXXX` name from a random device id.
    pub hostname: Option<String>,
    pub layout: ChannelLayout,
    pub push_interval: Duration,
    pub anti_flood_floor: Duration,
    pub keep_alive: Duration,
    pub subscriber_timeout: Duration,
    pub receive_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            layout: ChannelLayout::default(),
            push_interval: DEFAULT_PUSH_INTERVAL,
            anti_flood_floor: ANTI_FLOOD_FLOOR,
            keep_alive: KEEP_ALIVE_WINDOW,
            subscriber_timeout: DEFAULT_SUBSCRIBER_TIMEOUT,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
        }
    }
}
