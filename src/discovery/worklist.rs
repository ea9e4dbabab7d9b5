//! Fixed-capacity LIFO stack of pending UID ranges.
//!
//! Bisection never goes deeper than 48 levels and each level leaves at most
//! one sibling behind, so 49 slots cover a pure bisection.  The extra
//! headroom absorbs ranges split around devices that refuse to mute.

use crate::rdm::UidRange;

pub const WORKLIST_CAPACITY: usize = 64;

/// The stack is full; the range was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorklistOverflow;

#[derive(Debug, Default)]
pub struct Worklist {
    stack: heapless::Vec<UidRange, WORKLIST_CAPACITY>,
    high_water: usize,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything and seed with `range`.
    pub fn reset(&mut self, range: UidRange) {
        self.stack.clear();
        self.high_water = 0;
        // Cannot fail on an empty stack.
        let _ = self.push(range);
    }

    pub fn push(&mut self, range: UidRange) -> Result<(), WorklistOverflow> {
        self.stack.push(range).map_err(|_| WorklistOverflow)?;
        self.high_water = self.high_water.max(self.stack.len());
        Ok(())
    }

    /// Push both parts so that `first` is popped before `second`.
    pub fn push_pair(
        &mut self,
        first: Option<UidRange>,
        second: Option<UidRange>,
    ) -> Result<(), WorklistOverflow> {
        if let Some(range) = second {
            self.push(range)?;
        }
        if let Some(range) = first {
            self.push(range)?;
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Option<UidRange> {
        self.stack.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Deepest the stack has been since the last [`reset`](Self::reset).
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}
