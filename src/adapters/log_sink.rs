//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing discovery events to the ESP-IDF
//! logger (UART / USB-CDC in production, `env`-style stderr on host).

use log::{info, warn};

use crate::app::events::DiscoveryEvent;
use crate::app::ports::EventSink;
use crate::discovery::Status;

/// Adapter that logs every [`DiscoveryEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DiscoveryEvent) {
        match event {
            DiscoveryEvent::PassStarted { port } => {
                info!("DISC | start | port={}", port);
            }
            DiscoveryEvent::DeviceFound { uid, muted } => {
                info!(
                    "DISC | found | uid={} | {}",
                    uid,
                    if *muted { "muted" } else { "NO MUTE" }
                );
            }
            DiscoveryEvent::MuteFailed(uid) => {
                warn!("DISC | mute failed | uid={}", uid);
            }
            DiscoveryEvent::Anomaly { range, error } => {
                warn!("DISC | anomaly | range={} | {}", range, error);
            }
            DiscoveryEvent::PassFinished {
                status,
                devices,
                stats,
            } => {
                let status = match status {
                    Status::Complete => "complete",
                    Status::Incomplete(_) => "INCOMPLETE",
                };
                info!(
                    "DISC | done | {} | devices={} | iter={} probes={} mutes={} \
                     retries={} coll={} bad={} anomalies={} | {}ms",
                    status,
                    devices,
                    stats.iterations,
                    stats.probes,
                    stats.mutes,
                    stats.retries,
                    stats.collisions,
                    stats.malformed,
                    stats.anomalies,
                    stats.elapsed_us / 1000,
                );
            }
            DiscoveryEvent::DeviceLost(uid) => {
                info!("DISC | lost | uid={}", uid);
            }
        }
    }
}
