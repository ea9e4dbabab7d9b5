//! Outbound discovery events.
//!
//! The [`DiscoveryEngine`](crate::discovery::DiscoveryEngine) and
//! [`RdmService`](super::service::RdmService) emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, forward to an
//! Art-Net TOD reply, etc.

use crate::discovery::{DiscoveryStats, Status};
use crate::error::DiscoveryError;
use crate::rdm::{Uid, UidRange};

/// Structured events emitted by the discovery core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A full pass began on `port`.
    PassStarted { port: u8 },

    /// A responder was identified and recorded.
    DeviceFound { uid: Uid, muted: bool },

    /// A recorded responder never acknowledged `DISC_MUTE`.
    MuteFailed(Uid),

    /// A probe of `range` produced something that should not happen on a
    /// healthy bus.
    Anomaly {
        range: UidRange,
        error: DiscoveryError,
    },

    /// The pass ended.
    PassFinished {
        status: Status,
        devices: usize,
        stats: DiscoveryStats,
    },

    /// A known device was dropped after failing a presence check.
    DeviceLost(Uid),
}
