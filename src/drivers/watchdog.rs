//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the node if the RDM task stalls for longer than the configured
//! timeout.  The main loop feeds it between commands; a full discovery pass
//! must finish inside one timeout, which is what the pass deadline is for.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Default TWDT timeout.
pub const WATCHDOG_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(WATCHDOG_TIMEOUT_MS)
    }
}

impl Watchdog {
    /// Reconfigure the TWDT and subscribe the current task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!(
                        "TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({} ms timeout)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self {
                    timeout_ms,
                    subscribed,
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): no-op, {} ms", timeout_ms);
            Self { timeout_ms }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Feed the watchdog.  Must be called at least once per timeout.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
