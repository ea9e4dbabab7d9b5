//! Binary-search discovery engine.
//!
//! One engine drives one physical RDM port.  A full pass un-mutes every
//! responder, then walks the 48-bit UID space with `DISC_UNIQUE_BRANCH`:
//!
//! ```text
//!   pop range ──▶ probe ──┬─ silence ─────────▶ discard
//!        ▲                ├─ one UID ─────────▶ record, mute, re-probe range
//!        │                ├─ collision ───────▶ bisect (singleton: anomaly)
//!        │                └─ malformed ×N ────▶ bisect (singleton: anomaly)
//!        └──────────────── worklist (LIFO, lower half first) ◀──┘
//! ```
//!
//! Pending ranges live on a fixed-capacity stack, never the call stack.
//! Every pass is bounded by an iteration budget and an optional deadline,
//! so a babbling or stuck responder degrades the result to
//! [`Status::Incomplete`] instead of hanging the port.

mod budget;
mod worklist;

pub use budget::PassBudget;
pub use worklist::{WORKLIST_CAPACITY, Worklist, WorklistOverflow};

use log::{debug, info, trace, warn};

use crate::app::events::DiscoveryEvent;
use crate::app::ports::{Clock, EventSink, RdmTransport};
use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::rdm::message::{MuteAck, RdmMessage, parse_mute_ack};
use crate::rdm::{DiscoveryResult, Tod, Uid, UidRange, classify};

// ───────────────────────────────────────────────────────────────
// Pass results
// ───────────────────────────────────────────────────────────────

/// Why a pass stopped before the worklist drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IterationBudget,
    Deadline,
    WorklistOverflow,
    TodFull,
}

impl From<StopReason> for DiscoveryError {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::IterationBudget | StopReason::Deadline => Self::BudgetExhausted,
            StopReason::WorklistOverflow => Self::WorklistOverflow,
            StopReason::TodFull => Self::TodFull,
        }
    }
}

/// Completion status of a full pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every range was resolved.
    Complete,
    /// The pass stopped early; the table holds what was found so far.
    Incomplete(StopReason),
}

impl Status {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Worklist pops.
    pub iterations: u32,
    /// `DISC_UNIQUE_BRANCH` frames sent, retries included.
    pub probes: u32,
    /// `DISC_MUTE` / `DISC_UN_MUTE` frames sent.
    pub mutes: u32,
    /// Repeated transmissions after a timeout or malformed reply.
    pub retries: u32,
    pub timeouts: u32,
    pub collisions: u32,
    pub malformed: u32,
    pub mute_failures: u32,
    pub anomalies: u32,
    /// Deepest the worklist got.
    pub max_depth: u16,
    pub elapsed_us: u64,
}

/// Everything a full pass produced.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    pub tod: Tod,
    pub status: Status,
    pub stats: DiscoveryStats,
}

// ───────────────────────────────────────────────────────────────
// Engine
// ───────────────────────────────────────────────────────────────

/// Discovery engine for one port.
///
/// Owns its transport for the lifetime of the engine; pass `&mut T` to
/// borrow one instead.
pub struct DiscoveryEngine<T, C> {
    transport: T,
    clock: C,
    message: RdmMessage,
    config: DiscoveryConfig,
    worklist: Worklist,
}

impl<T: RdmTransport, C: Clock> DiscoveryEngine<T, C> {
    pub fn new(transport: T, clock: C, controller_uid: Uid, config: DiscoveryConfig) -> Self {
        let message = RdmMessage::new(controller_uid, config.port);
        Self {
            transport,
            clock,
            message,
            config,
            worklist: Worklist::new(),
        }
    }

    pub fn controller_uid(&self) -> Uid {
        self.message.source()
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Replace the timing and budget parameters.  The port and source UID
    /// are fixed at construction unless `controller_uid` is set.
    pub fn reconfigure(&mut self, config: DiscoveryConfig) {
        if let Some(uid) = config.controller_uid {
            self.message.set_source(uid);
        }
        self.config = DiscoveryConfig {
            port: self.config.port,
            ..config
        };
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.clock)
    }

    // ── Full pass ─────────────────────────────────────────────

    /// Build a fresh table of devices from scratch.
    ///
    /// Never fails: problems on the bus show up as missing devices,
    /// [`DiscoveryEvent::Anomaly`] events, and an `Incomplete` status.
    pub fn full(&mut self, sink: &mut impl EventSink) -> DiscoveryOutcome {
        let port = self.config.port;
        info!("RDM: full discovery on port {}", port);
        sink.emit(&DiscoveryEvent::PassStarted { port });

        let mut tod = Tod::new();
        let mut stats = DiscoveryStats::default();

        self.un_mute_all(&mut stats);
        self.worklist.reset(UidRange::FULL);

        let mut budget = PassBudget::start(
            self.config.max_iterations,
            self.config.pass_deadline(),
            self.clock.now_us(),
        );

        let status = loop {
            if self.worklist.is_empty() {
                break Status::Complete;
            }
            if let Some(reason) = budget.exhausted(self.clock.now_us()) {
                break Status::Incomplete(reason);
            }
            let Some(range) = self.worklist.pop() else {
                break Status::Complete;
            };
            budget.consume();

            if let Err(reason) = self.resolve(range, &mut tod, &mut stats, sink) {
                break Status::Incomplete(reason);
            }
        };

        stats.iterations = budget.iterations();
        stats.max_depth = self.worklist.high_water() as u16;
        stats.elapsed_us = budget.elapsed_us(self.clock.now_us());

        match status {
            Status::Complete => info!(
                "RDM: port {} complete, {} device(s), {} probes in {} ms",
                port,
                tod.len(),
                stats.probes,
                stats.elapsed_us / 1000
            ),
            Status::Incomplete(reason) => warn!(
                "RDM: port {} incomplete ({:?}), {} device(s), {} ranges pending",
                port,
                reason,
                tod.len(),
                self.worklist.len()
            ),
        }

        sink.emit(&DiscoveryEvent::PassFinished {
            status,
            devices: tod.len(),
            stats,
        });

        DiscoveryOutcome { tod, status, stats }
    }

    /// Probe one range and act on the classified reply.
    fn resolve(
        &mut self,
        range: UidRange,
        tod: &mut Tod,
        stats: &mut DiscoveryStats,
        sink: &mut impl EventSink,
    ) -> Result<(), StopReason> {
        match self.probe(range, stats) {
            DiscoveryResult::NoResponse => {
                trace!("RDM: {} silent", range);
                Ok(())
            }
            DiscoveryResult::SingleUid(uid) => self.on_single(range, uid, tod, stats, sink),
            DiscoveryResult::Collision => {
                self.split_or_discard(range, DiscoveryError::Collision, stats, sink)
            }
            DiscoveryResult::Malformed => {
                self.split_or_discard(range, DiscoveryError::Malformed, stats, sink)
            }
        }
    }

    fn on_single(
        &mut self,
        range: UidRange,
        uid: Uid,
        tod: &mut Tod,
        stats: &mut DiscoveryStats,
        sink: &mut impl EventSink,
    ) -> Result<(), StopReason> {
        if tod.contains(uid) {
            // Recorded earlier and still answering: the mute did not stick.
            warn!("RDM: {} answered again in {}", uid, range);
            stats.anomalies += 1;
            tod.mark_mute_failed(uid);
            sink.emit(&DiscoveryEvent::Anomaly {
                range,
                error: DiscoveryError::Reanswered,
            });
            return if range.contains(uid) {
                self.push_around(range, uid)
            } else {
                self.split_or_discard(range, DiscoveryError::Reanswered, stats, sink)
            };
        }

        if tod.insert(uid).is_err() {
            warn!("RDM: table full, dropping {}", uid);
            sink.emit(&DiscoveryEvent::Anomaly {
                range,
                error: DiscoveryError::TodFull,
            });
            return Err(StopReason::TodFull);
        }

        if !range.contains(uid) {
            warn!("RDM: {} answered outside {}", uid, range);
            stats.anomalies += 1;
        }

        let muted = self.mute(uid, stats).is_some();
        sink.emit(&DiscoveryEvent::DeviceFound { uid, muted });

        if muted {
            info!("RDM: found {}", uid);
            if range.is_single() {
                Ok(())
            } else {
                self.push(range)
            }
        } else {
            warn!("RDM: {} did not acknowledge mute", uid);
            stats.mute_failures += 1;
            tod.mark_mute_failed(uid);
            sink.emit(&DiscoveryEvent::MuteFailed(uid));
            if range.contains(uid) {
                self.push_around(range, uid)
            } else if range.is_single() {
                Ok(())
            } else {
                self.push(range)
            }
        }
    }

    fn split_or_discard(
        &mut self,
        range: UidRange,
        error: DiscoveryError,
        stats: &mut DiscoveryStats,
        sink: &mut impl EventSink,
    ) -> Result<(), StopReason> {
        match range.bisect() {
            Some((low, high)) => {
                trace!("RDM: {} ({}), splitting", range, error);
                self.worklist
                    .push_pair(Some(low), Some(high))
                    .map_err(|_| self.overflow(range))
            }
            None => {
                warn!("RDM: {} at {}, discarding", error, range);
                stats.anomalies += 1;
                sink.emit(&DiscoveryEvent::Anomaly { range, error });
                Ok(())
            }
        }
    }

    /// Requeue `range` minus `uid`, lower part first.
    fn push_around(&mut self, range: UidRange, uid: Uid) -> Result<(), StopReason> {
        let (below, above) = range.exclude(uid);
        self.worklist
            .push_pair(below, above)
            .map_err(|_| self.overflow(range))
    }

    fn push(&mut self, range: UidRange) -> Result<(), StopReason> {
        self.worklist.push(range).map_err(|_| self.overflow(range))
    }

    fn overflow(&self, range: UidRange) -> StopReason {
        warn!(
            "RDM: worklist full ({} ranges), dropping {}",
            WORKLIST_CAPACITY, range
        );
        StopReason::WorklistOverflow
    }

    // ── Bus primitives ────────────────────────────────────────

    /// `DISC_UNIQUE_BRANCH` with retries.
    ///
    /// Silence and garbage are retried; a collision is returned at once.
    /// Garbage on any attempt wins over later silence.
    fn probe(&mut self, range: UidRange, stats: &mut DiscoveryStats) -> DiscoveryResult {
        let timeout = self.config.probe_timeout();
        let mut saw_malformed = false;

        for attempt in 0..self.config.probe_attempts.max(1) {
            if attempt > 0 {
                stats.retries += 1;
            }
            let frame = self.message.disc_unique_branch(range);
            stats.probes += 1;

            match classify(self.transport.send_and_wait(&frame, timeout)) {
                DiscoveryResult::NoResponse => stats.timeouts += 1,
                DiscoveryResult::Malformed => {
                    debug!("RDM: malformed reply to {}", range);
                    stats.malformed += 1;
                    saw_malformed = true;
                }
                DiscoveryResult::Collision => {
                    stats.collisions += 1;
                    return DiscoveryResult::Collision;
                }
                found @ DiscoveryResult::SingleUid(_) => return found,
            }
        }

        if saw_malformed {
            DiscoveryResult::Malformed
        } else {
            DiscoveryResult::NoResponse
        }
    }

    /// Addressed `DISC_MUTE` with retries.
    fn mute(&mut self, uid: Uid, stats: &mut DiscoveryStats) -> Option<MuteAck> {
        let timeout = self.config.mute_timeout();

        for attempt in 0..self.config.probe_attempts.max(1) {
            if attempt > 0 {
                stats.retries += 1;
            }
            let (request, frame) = self.message.disc_mute(uid);
            stats.mutes += 1;

            match self.transport.send_and_wait(&frame, timeout) {
                Some(reply) => match parse_mute_ack(reply, &request) {
                    Some(ack) => {
                        if let Some(binding) = ack.binding_uid {
                            debug!("RDM: {} bound to {}", uid, binding);
                        }
                        return Some(ack);
                    }
                    None => debug!("RDM: bad mute reply from {}", uid),
                },
                None => stats.timeouts += 1,
            }
        }
        None
    }

    /// Broadcast `DISC_UN_MUTE`.  Nobody answers a broadcast.
    fn un_mute_all(&mut self, stats: &mut DiscoveryStats) {
        let (_, frame) = self.message.disc_un_mute(Uid::BROADCAST);
        stats.mutes += 1;
        let _ = self
            .transport
            .send_and_wait(&frame, self.config.mute_timeout());
    }

    // ── Directed presence check ───────────────────────────────

    /// Is `uid` on the bus right now?
    ///
    /// Sends an addressed `DISC_MUTE` (muted devices still acknowledge it)
    /// and falls back to a one-UID `DISC_UNIQUE_BRANCH`.  Touches no table.
    pub fn quick_find(&mut self, uid: Uid) -> bool {
        if uid.is_broadcast() {
            return false;
        }
        let mut stats = DiscoveryStats::default();

        if self.mute(uid, &mut stats).is_some() {
            debug!("RDM: {} present (mute ack)", uid);
            return true;
        }

        let present = matches!(
            self.probe(UidRange::single(uid), &mut stats),
            DiscoveryResult::SingleUid(found) if found == uid
        );
        debug!("RDM: {} {}", uid, if present { "present" } else { "absent" });
        present
    }
}
