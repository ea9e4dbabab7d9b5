//! Per-pass iteration and wall-clock budget.

use core::time::Duration;

use super::StopReason;

/// Tracks how much of a pass's budget has been spent.
///
/// One iteration is one worklist pop.  The deadline is measured against a
/// [`Clock`](crate::app::ports::Clock) reading taken when the pass began.
#[derive(Debug, Clone, Copy)]
pub struct PassBudget {
    max_iterations: u32,
    iterations: u32,
    started_us: u64,
    deadline_us: Option<u64>,
}

impl PassBudget {
    pub fn start(max_iterations: u32, deadline: Option<Duration>, now_us: u64) -> Self {
        Self {
            max_iterations,
            iterations: 0,
            started_us: now_us,
            deadline_us: deadline
                .map(|d| now_us.saturating_add(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))),
        }
    }

    /// Why the pass must stop now, if it must.
    pub fn exhausted(&self, now_us: u64) -> Option<StopReason> {
        if self.iterations >= self.max_iterations {
            return Some(StopReason::IterationBudget);
        }
        match self.deadline_us {
            Some(deadline) if now_us >= deadline => Some(StopReason::Deadline),
            _ => None,
        }
    }

    /// Account for one worklist pop.
    pub fn consume(&mut self) {
        self.iterations = self.iterations.saturating_add(1);
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn elapsed_us(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.started_us)
    }
}
