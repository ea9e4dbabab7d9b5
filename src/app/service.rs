//! RDM service: the hexagonal core for one port.
//!
//! [`RdmService`] owns the discovery engine and the last published table
//! of devices.  Commands come in from the outside world, events go out
//! through an [`EventSink`] injected at the call site.
//!
//! ```text
//!  RdmCommand ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │       RdmService        │
//! RdmTransport ◀──│  DiscoveryEngine · TOD  │
//!                 └────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::DiscoveryConfig;
use crate::discovery::{DiscoveryEngine, DiscoveryStats, Status};
use crate::rdm::{Tod, Uid};

use super::commands::{RdmCommand, RdmReply};
use super::events::DiscoveryEvent;
use super::ports::{Clock, ConfigError, EventSink, RdmTransport};

// ───────────────────────────────────────────────────────────────
// RdmService
// ───────────────────────────────────────────────────────────────

pub struct RdmService<T, C> {
    engine: DiscoveryEngine<T, C>,
    /// Published table; replaced wholesale after every full pass.
    tod: Tod,
    last_status: Option<Status>,
    last_stats: DiscoveryStats,
}

impl<T: RdmTransport, C: Clock> RdmService<T, C> {
    /// Build the service.  Nothing is sent until [`start`](Self::start) or
    /// the first command.
    pub fn new(transport: T, clock: C, controller_uid: Uid, config: DiscoveryConfig) -> Self {
        Self {
            engine: DiscoveryEngine::new(transport, clock, controller_uid, config),
            tod: Tod::new(),
            last_status: None,
            last_stats: DiscoveryStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run the startup pass if the configuration asks for one.
    pub fn start(&mut self, sink: &mut impl EventSink) -> Option<RdmReply> {
        let config = self.engine.config();
        if !config.enable_rdm {
            info!("RDM: disabled on port {}", config.port);
            return None;
        }
        if !config.discovery_at_startup {
            return None;
        }
        Some(self.handle_command(RdmCommand::FullDiscovery, sink))
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn handle_command(&mut self, cmd: RdmCommand, sink: &mut impl EventSink) -> RdmReply {
        if !self.engine.config().enable_rdm {
            warn!("RDM: {:?} ignored, RDM disabled", cmd);
            return RdmReply::Disabled;
        }

        match cmd {
            RdmCommand::FullDiscovery => {
                let outcome = self.engine.full(sink);
                self.tod = outcome.tod;
                self.last_status = Some(outcome.status);
                self.last_stats = outcome.stats;
                RdmReply::TodUpdated {
                    devices: self.tod.len(),
                    complete: outcome.status.is_complete(),
                }
            }
            RdmCommand::Incremental => {
                self.refresh(sink);
                RdmReply::TodUpdated {
                    devices: self.tod.len(),
                    complete: self.last_status.is_some_and(|s| s.is_complete()),
                }
            }
            RdmCommand::QuickFind(uid) => RdmReply::Presence {
                uid,
                present: self.engine.quick_find(uid),
            },
        }
    }

    /// Presence-check every known device and drop the ones that vanished.
    fn refresh(&mut self, sink: &mut impl EventSink) {
        let known: heapless::Vec<Uid, { crate::rdm::tod::TOD_CAPACITY }> =
            self.tod.iter().collect();

        for uid in known {
            if self.engine.quick_find(uid) {
                continue;
            }
            info!("RDM: lost {}", uid);
            self.tod.remove(uid);
            sink.emit(&DiscoveryEvent::DeviceLost(uid));
        }
    }

    // ── Configuration ─────────────────────────────────────────

    /// Validate and apply new parameters.  Takes effect on the next pass.
    pub fn apply_config(&mut self, config: DiscoveryConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.engine.reconfigure(config);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn tod(&self) -> &Tod {
        &self.tod
    }

    pub fn config(&self) -> &DiscoveryConfig {
        self.engine.config()
    }

    pub fn controller_uid(&self) -> Uid {
        self.engine.controller_uid()
    }

    /// Status of the last full pass, `None` before the first one.
    pub fn last_status(&self) -> Option<Status> {
        self.last_status
    }

    pub fn last_stats(&self) -> &DiscoveryStats {
        &self.last_stats
    }

    pub fn engine_mut(&mut self) -> &mut DiscoveryEngine<T, C> {
        &mut self.engine
    }
}
