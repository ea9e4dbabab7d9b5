//! Simulated RDM bus.
//!
//! A host-side [`RdmTransport`] populated with virtual responders that
//! behave like E1.20 devices during discovery: they answer
//! `DISC_UNIQUE_BRANCH` when unmuted and inside the probed range, and
//! acknowledge addressed `DISC_MUTE` / `DISC_UN_MUTE`.
//!
//! When several responders answer the same probe, the merged reply keeps
//! only the bytes they agree on and turns every other byte into `0x00`,
//! which is how a real line looks to the UART after two drivers fight.

use core::time::Duration;

use log::trace;

use crate::app::ports::RdmTransport;
use crate::rdm::message::{self, MessageHeader};
use crate::rdm::response::encode_discovery_response;
use crate::rdm::{
    DISCOVERY_COMMAND, MAX_PREAMBLE_LEN, PID_DISC_MUTE, PID_DISC_UN_MUTE, PID_DISC_UNIQUE_BRANCH,
    UID_SIZE, Uid, UidRange,
};

/// One virtual device on the bus.
#[derive(Debug, Clone)]
pub struct SimResponder {
    pub uid: Uid,
    pub muted: bool,
    /// Whether the device honours `DISC_MUTE`.  A broken device keeps
    /// answering discovery and never acknowledges the mute.
    pub honours_mute: bool,
    /// `0xFE` bytes before the separator (0–7).
    pub preamble_len: usize,
}

/// Per-PID request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusCounters {
    pub unique_branch: u32,
    pub mute: u32,
    pub un_mute: u32,
}

#[derive(Debug, Default)]
pub struct SimulatedBus {
    responders: Vec<SimResponder>,
    counters: BusCounters,
    /// Drop every n-th reply to exercise retries.
    drop_every: Option<u32>,
    replies: u32,
    reply: Vec<u8>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(uids: impl IntoIterator<Item = Uid>) -> Self {
        let mut bus = Self::new();
        for uid in uids {
            bus.add(uid);
        }
        bus
    }

    /// Connect a well-behaved device with a full preamble.
    pub fn add(&mut self, uid: Uid) -> &mut SimResponder {
        self.responders.push(SimResponder {
            uid,
            muted: false,
            honours_mute: true,
            preamble_len: MAX_PREAMBLE_LEN,
        });
        let last = self.responders.len() - 1;
        &mut self.responders[last]
    }

    /// Disconnect every device with this UID.
    pub fn remove(&mut self, uid: Uid) -> bool {
        let before = self.responders.len();
        self.responders.retain(|r| r.uid != uid);
        self.responders.len() != before
    }

    pub fn responder(&self, uid: Uid) -> Option<&SimResponder> {
        self.responders.iter().find(|r| r.uid == uid)
    }

    pub fn is_muted(&self, uid: Uid) -> Option<bool> {
        self.responder(uid).map(|r| r.muted)
    }

    pub fn counters(&self) -> BusCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = BusCounters::default();
    }

    /// Lose every `n`-th reply (`0` disables).
    pub fn set_drop_every(&mut self, n: u32) {
        self.drop_every = (n > 0).then_some(n);
    }

    fn unique_branch(&mut self, pd: &[u8]) -> bool {
        self.counters.unique_branch += 1;
        let Some(range) = decode_range(pd) else {
            return false;
        };

        let mut answering = self
            .responders
            .iter()
            .filter(|r| !r.muted && range.contains(r.uid));
        let Some(first) = answering.next() else {
            return false;
        };
        self.reply.clear();
        self.reply
            .extend_from_slice(&encode_discovery_response(first.uid, first.preamble_len));

        for other in answering {
            trace!("sim: {} collides in {}", other.uid, range);
            let frame = encode_discovery_response(other.uid, other.preamble_len);
            if frame.len() > self.reply.len() {
                self.reply.resize(frame.len(), 0);
            }
            for (i, byte) in self.reply.iter_mut().enumerate() {
                if frame.get(i).copied() != Some(*byte) {
                    *byte = 0x00;
                }
            }
        }
        true
    }

    fn mute(&mut self, header: &MessageHeader, mute: bool) -> bool {
        if mute {
            self.counters.mute += 1;
        } else {
            self.counters.un_mute += 1;
        }

        if header.destination.is_broadcast() {
            for r in self.responders.iter_mut().filter(|r| r.honours_mute) {
                r.muted = mute;
            }
            return false;
        }

        let Some(r) = self
            .responders
            .iter_mut()
            .find(|r| r.uid == header.destination)
        else {
            return false;
        };
        if !r.honours_mute {
            return false;
        }
        r.muted = mute;
        let ack = message::encode_mute_ack(header, r.uid, 0);
        self.reply.clear();
        self.reply.extend_from_slice(&ack);
        true
    }

    fn dropped(&mut self) -> bool {
        self.replies += 1;
        self.drop_every.is_some_and(|n| self.replies % n == 0)
    }
}

fn decode_range(pd: &[u8]) -> Option<UidRange> {
    let (lo, hi) = pd.split_at_checked(UID_SIZE)?;
    let lo = Uid::from_bytes(lo.try_into().ok()?);
    let hi = Uid::from_bytes(hi.try_into().ok()?);
    UidRange::new(lo, hi)
}

impl RdmTransport for SimulatedBus {
    fn send_and_wait(&mut self, request: &[u8], _timeout: Duration) -> Option<&[u8]> {
        let (header, pd) = message::decode(request)?;
        if header.command_class != DISCOVERY_COMMAND {
            return None;
        }

        let replied = match header.pid {
            PID_DISC_UNIQUE_BRANCH => self.unique_branch(pd),
            PID_DISC_MUTE => self.mute(&header, true),
            PID_DISC_UN_MUTE => self.mute(&header, false),
            _ => false,
        };

        if !replied || self.dropped() {
            return None;
        }
        Some(self.reply.as_slice())
    }
}
