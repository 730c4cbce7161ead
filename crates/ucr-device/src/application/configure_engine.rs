//! ConfigureEngineUseCase: builds a ready-to-tick engine from configuration.
//!
//! Channels listed with an `index` are placed first so that auto-assigned
//! channels fill the gaps around them instead of stealing a requested slot.

use tracing::{debug, info};
use ucr_core::{Clock, DocumentCodec, Engine, EngineConfig, Transport};

use crate::infrastructure::storage::config::{ChannelEntry, ConfigError, DeviceConfig};

/// Maps the file configuration onto engine settings.
pub fn engine_config(config: &DeviceConfig) -> EngineConfig {
    EngineConfig {
        hostname: config.device.hostname.clone(),
        push_interval: config.timing.push_interval(),
        subscriber_timeout: config.timing.subscriber_timeout(),
        receive_buffer_size: config.network.receive_buffer_size,
        ..Default::default()
    }
}

/// Registers every configured channel with `engine`.
///
/// Returns the number of channels registered.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidChannel`] for an empty name, a requested
/// index that is out of range or already taken, or a category that is full.
pub fn register_channels<T, C, K>(
    engine: &mut Engine<T, C, K>,
    channels: &[ChannelEntry],
) -> Result<usize, ConfigError>
where
    T: Transport,
    C: DocumentCodec,
    K: Clock,
{
    let (pinned, floating): (Vec<&ChannelEntry>, Vec<&ChannelEntry>) =
        channels.iter().partition(|c| c.index.is_some());

    for channel in pinned.iter().chain(floating.iter()) {
        if channel.name.trim().is_empty() {
            return Err(ConfigError::InvalidChannel(format!(
                "{} {} channel has an empty name",
                channel.direction, channel.category
            )));
        }

        let index = match channel.index {
            Some(index) => engine
                .register_at(channel.direction, channel.category, &channel.name, index)
                .ok_or_else(|| {
                    ConfigError::InvalidChannel(format!(
                        "{} {} index {index} for {:?} is out of range or already taken",
                        channel.direction, channel.category, channel.name
                    ))
                })?,
            None => engine
                .register(channel.direction, channel.category, &channel.name)
                .map_err(|e| ConfigError::InvalidChannel(format!("{:?}: {e}", channel.name)))?,
        };
        debug!(direction = %channel.direction, category = %channel.category, name = %channel.name, index, "channel registered");
    }

    Ok(channels.len())
}

/// Builds an engine over `transport` and registers the configured channels.
///
/// # Errors
///
/// Propagates [`register_channels`] failures.
pub fn build_engine<T: Transport>(transport: T, config: &DeviceConfig) -> Result<Engine<T>, ConfigError> {
    let mut engine = Engine::new(transport, engine_config(config));
    let registered = register_channels(&mut engine, &config.channels)?;
    info!(hostname = engine.hostname(), channels = registered, "engine configured");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ucr_core::transport::loopback::LoopbackTransport;
    use ucr_core::{Category, Direction};

    fn channel(direction: Direction, category: Category, name: &str, index: Option<usize>) -> ChannelEntry {
        ChannelEntry {
            direction,
            category,
            name: name.to_string(),
            index,
        }
    }

    #[test]
    fn test_engine_config_carries_timing_and_identity() {
        // Arrange
        let mut cfg = DeviceConfig::default();
        cfg.device.hostname = Some("panel".to_string());
        cfg.timing.push_interval_ms = 40;
        cfg.timing.subscriber_timeout_ms = 5_000;
        cfg.network.receive_buffer_size = 1024;

        // Act
        let engine_cfg = engine_config(&cfg);

        // Assert
        assert_eq!(engine_cfg.hostname.as_deref(), Some("panel"));
        assert_eq!(engine_cfg.push_interval, Duration::from_millis(40));
        assert_eq!(engine_cfg.subscriber_timeout, Duration::from_secs(5));
        assert_eq!(engine_cfg.receive_buffer_size, 1024);
        assert_eq!(engine_cfg.anti_flood_floor, Duration::from_millis(5));
    }

    #[test]
    fn test_pinned_channels_are_placed_before_auto_assigned_ones() {
        // Arrange
        let mut cfg = DeviceConfig::default();
        cfg.channels = vec![
            channel(Direction::Input, Category::Button, "a", None),
            channel(Direction::Input, Category::Button, "b", Some(0)),
        ];

        // Act
        let engine = build_engine(LoopbackTransport::new(), &cfg).expect("build");

        // Assert
        let registry = engine.registry();
        assert_eq!(registry.name(Direction::Input, Category::Button, 0), Some("b"));
        assert_eq!(registry.name(Direction::Input, Category::Button, 1), Some("a"));
    }

    #[test]
    fn test_duplicate_index_is_rejected() {
        let mut cfg = DeviceConfig::default();
        cfg.channels = vec![
            channel(Direction::Output, Category::Axis, "fan", Some(2)),
            channel(Direction::Output, Category::Axis, "pump", Some(2)),
        ];

        let result = build_engine(LoopbackTransport::new(), &cfg);

        assert!(matches!(result, Err(ConfigError::InvalidChannel(_))));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut cfg = DeviceConfig::default();
        cfg.channels = vec![channel(Direction::Input, Category::Event, "  ", None)];

        let result = build_engine(LoopbackTransport::new(), &cfg);

        assert!(matches!(result, Err(ConfigError::InvalidChannel(_))));
    }

    #[test]
    fn test_full_category_is_rejected() {
        // Arrange
        let mut cfg = DeviceConfig::default();
        cfg.channels = (0..33)
            .map(|i| channel(Direction::Input, Category::Delta, &format!("d{i}"), None))
            .collect();

        // Act
        let result = build_engine(LoopbackTransport::new(), &cfg);

        // Assert
        let Err(ConfigError::InvalidChannel(message)) = result else {
            panic!("33 deltas must not fit in 32 slots");
        };
        assert!(message.contains("d32"));
    }
}
