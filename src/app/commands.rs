//! Inbound commands to the RDM service.
//!
//! These represent actions requested by the outside world (Art-Net
//! TodControl / TodRequest, remote config, console) that the
//! [`RdmService`](super::service::RdmService) interprets and acts upon.

use crate::rdm::Uid;

/// Commands that external adapters can send into the discovery core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdmCommand {
    /// Flush the table and rediscover the whole bus.
    FullDiscovery,

    /// Re-check every known device and drop the ones that vanished.
    Incremental,

    /// Directed presence check for one device.
    QuickFind(Uid),
}

/// What the service did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdmReply {
    /// RDM is disabled in the configuration; nothing was sent.
    Disabled,

    /// The table was rebuilt or refreshed and now holds `devices` UIDs.
    TodUpdated { devices: usize, complete: bool },

    /// Result of a [`RdmCommand::QuickFind`].
    Presence { uid: Uid, present: bool },
}
