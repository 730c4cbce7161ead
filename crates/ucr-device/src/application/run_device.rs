//! RunDeviceUseCase: ticks the engine at a fixed cadence until shutdown.
//!
//! # Missed ticks
//!
//! The loop uses `tokio::time::interval` with [`MissedTickBehavior::Skip`]:
//! if the process stalls, the engine resumes at the next period boundary
//! instead of firing a burst of catch-up ticks.  The engine measures its own
//! time, so skipped ticks only delay the next poll.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use ucr_core::{Clock, DocumentCodec, Engine, Transport};

/// Counters gathered over one run of the tick loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub received: u64,
    pub pushed: u64,
    pub subscriber_timeouts: u64,
}

/// Ticks `engine` every `period` until `shutdown` completes.
pub async fn run_tick_loop<T, C, K, S>(
    engine: &mut Engine<T, C, K>,
    period: Duration,
    shutdown: S,
) -> RunSummary
where
    T: Transport,
    C: DocumentCodec,
    K: Clock,
    S: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut summary = RunSummary::default();
    info!(?period, hostname = engine.hostname(), "tick loop started");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                let report = engine.tick();
                summary.ticks += 1;
                summary.received += u64::from(report.received);
                summary.pushed += u64::from(report.pushed);
                summary.subscriber_timeouts += u64::from(report.subscriber_timed_out);
                if report.received {
                    debug!(?report, "tick handled a datagram");
                }
            }
        }
    }

    info!(
        ticks = summary.ticks,
        received = summary.received,
        pushed = summary.pushed,
        "tick loop stopped"
    );
    summary
}
