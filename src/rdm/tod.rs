//! Table Of Devices.
//!
//! Insertion-ordered, duplicate-free set of UIDs found on one port.  A
//! table is built by exactly one discovery pass and handed to the caller
//! read-only; the next full pass starts from an empty table.

use core::fmt;

use super::UID_SIZE;
use super::uid::Uid;

/// Maximum responders tracked per port.
pub const TOD_CAPACITY: usize = 200;

/// One discovered responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodEntry {
    pub uid: Uid,
    /// Identified, but never acknowledged `DISC_MUTE` (or answered again
    /// after it did).  It may reappear in later probes of the same pass.
    pub mute_failed: bool,
}

/// The table already holds [`TOD_CAPACITY`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodFull;

impl fmt::Display for TodFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table of devices full ({TOD_CAPACITY} entries)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tod {
    entries: heapless::Vec<TodEntry, TOD_CAPACITY>,
}

impl Tod {
    pub fn new() -> Self {
        Self::default()
    }

    /// UIDs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Uid> + '_ {
        self.entries.iter().map(|e| e.uid)
    }

    pub fn entries(&self) -> &[TodEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.position(uid).is_some()
    }

    pub fn is_mute_failed(&self, uid: Uid) -> bool {
        self.position(uid)
            .is_some_and(|i| self.entries[i].mute_failed)
    }

    /// Pack every UID as 6 big-endian bytes into `out`, in table order.
    ///
    /// Returns the number of UIDs written (stops when `out` is full).
    pub fn copy_uids(&self, out: &mut [u8]) -> usize {
        let mut written = 0;
        for (slot, uid) in out.chunks_exact_mut(UID_SIZE).zip(self.iter()) {
            slot.copy_from_slice(&uid.to_bytes());
            written += 1;
        }
        written
    }

    // ── Mutation (discovery pass and service only) ────────────

    /// Add `uid`.  `Ok(false)` if it was already present.
    pub(crate) fn insert(&mut self, uid: Uid) -> Result<bool, TodFull> {
        if self.contains(uid) {
            return Ok(false);
        }
        self.entries
            .push(TodEntry {
                uid,
                mute_failed: false,
            })
            .map_err(|_| TodFull)?;
        Ok(true)
    }

    pub(crate) fn mark_mute_failed(&mut self, uid: Uid) {
        if let Some(i) = self.position(uid) {
            self.entries[i].mute_failed = true;
        }
    }

    /// Remove `uid`, preserving the order of the remaining entries.
    pub(crate) fn remove(&mut self, uid: Uid) -> bool {
        match self.position(uid) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    fn position(&self, uid: Uid) -> Option<usize> {
        self.entries.iter().position(|e| e.uid == uid)
    }
}

impl<'a> IntoIterator for &'a Tod {
    type Item = &'a TodEntry;
    type IntoIter = core::slice::Iter<'a, TodEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
