//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use core::cell::Cell;

use crate::app::ports::Clock;

/// System clock for the discovery deadline.
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.now_us() / 1_000_000
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// Hand-driven clock for simulation and tests.
///
/// Every reading advances time by `step_us`, so a loop that polls the
/// clock sees time pass without any real waiting.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: Cell<u64>,
    step_us: u64,
}

impl ManualClock {
    pub fn new(step_us: u64) -> Self {
        Self {
            now_us: Cell::new(0),
            step_us,
        }
    }

    pub fn advance(&self, us: u64) {
        self.now_us.set(self.now_us.get().saturating_add(us));
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        let now = self.now_us.get();
        self.now_us.set(now.saturating_add(self.step_us));
        now
    }
}
