//! Mock buses and sinks for integration tests.
//!
//! [`OracleBus`] answers every probe from the device set directly instead
//! of merging frames, so tests can reason about probe counts exactly.

use std::collections::BTreeSet;
use std::time::Duration;

use rdm_discovery::app::events::DiscoveryEvent;
use rdm_discovery::app::ports::{EventSink, RdmTransport};
use rdm_discovery::rdm::message::{self, encode_mute_ack};
use rdm_discovery::rdm::response::encode_discovery_response;
use rdm_discovery::rdm::{
    PID_DISC_MUTE, PID_DISC_UN_MUTE, PID_DISC_UNIQUE_BRANCH, UID_SIZE, Uid, UidRange,
};

pub const CONTROLLER: Uid = Uid::new(0x7FF0, 0x0000_0001);

/// Preamble, separator and sixteen bytes with every forced bit cleared.
pub fn collision_frame() -> Vec<u8> {
    let mut frame = vec![0xFE, 0xAA];
    frame.extend_from_slice(&[0u8; 16]);
    frame
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<DiscoveryEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn found(&self) -> Vec<Uid> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DiscoveryEvent::DeviceFound { uid, .. } => Some(*uid),
                _ => None,
            })
            .collect()
    }

    pub fn lost(&self) -> Vec<Uid> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DiscoveryEvent::DeviceLost(uid) => Some(*uid),
                _ => None,
            })
            .collect()
    }

    pub fn anomalies(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, DiscoveryEvent::Anomaly { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &DiscoveryEvent) {
        self.events.push(event.clone());
    }
}

// ── OracleBus ─────────────────────────────────────────────────

/// Well-behaved devices with an idealised collision model.
#[derive(Default)]
pub struct OracleBus {
    pub devices: BTreeSet<Uid>,
    pub muted: BTreeSet<Uid>,
    pub probes: u32,
    /// PIDs in the order they were sent.
    pub pids: Vec<u16>,
    reply: Vec<u8>,
}

#[allow(dead_code)]
impl OracleBus {
    pub fn new(devices: impl IntoIterator<Item = Uid>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl RdmTransport for OracleBus {
    fn send_and_wait(&mut self, request: &[u8], _timeout: Duration) -> Option<&[u8]> {
        let (header, pd) = message::decode(request)?;
        self.pids.push(header.pid);
        self.reply.clear();

        match header.pid {
            PID_DISC_UNIQUE_BRANCH => {
                self.probes += 1;
                let lo = Uid::from_bytes(pd[..UID_SIZE].try_into().ok()?);
                let hi = Uid::from_bytes(pd[UID_SIZE..].try_into().ok()?);
                let range = UidRange::new(lo, hi)?;
                let mut live = self
                    .devices
                    .iter()
                    .filter(|u| range.contains(**u) && !self.muted.contains(*u));
                match (live.next(), live.next()) {
                    (None, _) => return None,
                    (Some(uid), None) => {
                        self.reply
                            .extend_from_slice(&encode_discovery_response(*uid, 7));
                    }
                    (Some(_), Some(_)) => self.reply = collision_frame(),
                }
            }
            PID_DISC_MUTE | PID_DISC_UN_MUTE => {
                let mute = header.pid == PID_DISC_MUTE;
                if header.destination.is_broadcast() {
                    if mute {
                        self.muted = self.devices.clone();
                    } else {
                        self.muted.clear();
                    }
                    return None;
                }
                if !self.devices.contains(&header.destination) {
                    return None;
                }
                if mute {
                    self.muted.insert(header.destination);
                } else {
                    self.muted.remove(&header.destination);
                }
                self.reply
                    .extend_from_slice(&encode_mute_ack(&header, header.destination, 0));
            }
            _ => return None,
        }
        Some(self.reply.as_slice())
    }
}

// ── AlwaysCollision ───────────────────────────────────────────

/// A bus so noisy every probe looks like a collision.
pub struct AlwaysCollision {
    pub probes: u32,
    frame: Vec<u8>,
}

impl AlwaysCollision {
    pub fn new() -> Self {
        Self {
            probes: 0,
            frame: collision_frame(),
        }
    }
}

impl RdmTransport for AlwaysCollision {
    fn send_and_wait(&mut self, request: &[u8], _timeout: Duration) -> Option<&[u8]> {
        let (header, _) = message::decode(request)?;
        if header.pid != PID_DISC_UNIQUE_BRANCH {
            return None;
        }
        self.probes += 1;
        Some(self.frame.as_slice())
    }
}

// ── Phantom ───────────────────────────────────────────────────

/// A bus that answers `frame` to every probe whose range covers `uid`,
/// while no real device is present.
pub struct Phantom {
    pub uid: Uid,
    /// Probes of the single-UID range `[uid, uid]`.
    pub singleton_probes: u32,
    frame: Vec<u8>,
}

impl Phantom {
    pub fn new(uid: Uid, frame: Vec<u8>) -> Self {
        Self {
            uid,
            singleton_probes: 0,
            frame,
        }
    }
}

impl RdmTransport for Phantom {
    fn send_and_wait(&mut self, request: &[u8], _timeout: Duration) -> Option<&[u8]> {
        let (header, pd) = message::decode(request)?;
        if header.pid != PID_DISC_UNIQUE_BRANCH {
            return None;
        }
        let lo = Uid::from_bytes(pd[..UID_SIZE].try_into().ok()?);
        let hi = Uid::from_bytes(pd[UID_SIZE..].try_into().ok()?);
        let range = UidRange::new(lo, hi)?;
        if !range.contains(self.uid) {
            return None;
        }
        if range.is_single() {
            self.singleton_probes += 1;
        }
        Some(self.frame.as_slice())
    }
}
