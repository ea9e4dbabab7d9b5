//! Discovery configuration parameters
//!
//! All tunable parameters for one RDM port.  Values can be overridden via
//! NVS, a JSON blob from remote config, or `key=value` lines from the
//! node's parameter file (`rdm.txt`).

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::rdm::Uid;

/// Per-port discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    // --- Node ---
    /// Master switch for RDM on this port
    pub enable_rdm: bool,
    /// Run a full discovery pass right after boot
    pub discovery_at_startup: bool,
    /// Controller source UID; derived from the factory MAC when unset
    pub controller_uid: Option<Uid>,
    /// Zero-based output port (wire port ID is `port + 1`)
    pub port: u8,

    // --- Bus timing ---
    /// Wait for a DISC_UNIQUE_BRANCH response (microseconds)
    pub probe_timeout_us: u32,
    /// Wait for a DISC_MUTE / DISC_UN_MUTE acknowledgement (microseconds)
    pub mute_timeout_us: u32,
    /// Transmissions per probe or mute before giving up (>= 1)
    pub probe_attempts: u8,

    // --- Pass budget ---
    /// Maximum worklist pops per full pass
    pub max_iterations: u32,
    /// Wall-clock limit per full pass (milliseconds); `None` = unbounded
    pub pass_deadline_ms: Option<u32>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            // Node
            enable_rdm: false,
            discovery_at_startup: false,
            controller_uid: None,
            port: 0,

            // Bus timing
            probe_timeout_us: 5_000, // 2.8 ms turnaround + 24-byte frame
            mute_timeout_us: 5_000,
            probe_attempts: 3,

            // Pass budget
            max_iterations: 20_000,
            pass_deadline_ms: Some(8_000), // below the 10 s task watchdog
        }
    }
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_micros(u64::from(self.probe_timeout_us))
    }

    pub fn mute_timeout(&self) -> Duration {
        Duration::from_micros(u64::from(self.mute_timeout_us))
    }

    pub fn pass_deadline(&self) -> Option<Duration> {
        self.pass_deadline_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10).contains(&self.probe_attempts) {
            return Err(ConfigError::ValidationFailed(
                "probe_attempts must be 1–10",
            ));
        }
        if !(500..=100_000).contains(&self.probe_timeout_us) {
            return Err(ConfigError::ValidationFailed(
                "probe_timeout_us must be 500–100000",
            ));
        }
        if !(500..=100_000).contains(&self.mute_timeout_us) {
            return Err(ConfigError::ValidationFailed(
                "mute_timeout_us must be 500–100000",
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_iterations must be > 0",
            ));
        }
        if let Some(ms) = self.pass_deadline_ms {
            if !(100..=600_000).contains(&ms) {
                return Err(ConfigError::ValidationFailed(
                    "pass_deadline_ms must be 100–600000",
                ));
            }
        }
        if self.controller_uid.is_some_and(Uid::is_broadcast) {
            return Err(ConfigError::ValidationFailed(
                "controller_uid must not be the broadcast UID",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON blob from remote configuration.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(|_| ConfigError::Corrupted)
    }

    /// Apply `key=value` lines from a parameter file.
    ///
    /// Blank lines and `#` comments are skipped, unknown keys are ignored.
    /// Stops at the first malformed value of a known key.
    pub fn apply_params(&mut self, text: &str) -> Result<(), ConfigError> {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            self.apply_param(key.trim(), value.trim())?;
        }
        Ok(())
    }

    fn apply_param(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "enable_rdm" => self.enable_rdm = parse_flag(key, value)?,
            "rdm_discovery_at_startup" => self.discovery_at_startup = parse_flag(key, value)?,
            "rdm_port" => self.port = parse_num(key, value)?,
            "rdm_uid" => {
                self.controller_uid =
                    Some(value.parse().map_err(|_| ConfigError::Syntax("rdm_uid"))?);
            }
            "rdm_probe_timeout_us" => self.probe_timeout_us = parse_num(key, value)?,
            "rdm_mute_timeout_us" => self.mute_timeout_us = parse_num(key, value)?,
            "rdm_probe_attempts" => self.probe_attempts = parse_num(key, value)?,
            "rdm_max_iterations" => self.max_iterations = parse_num(key, value)?,
            "rdm_pass_deadline_ms" => {
                let ms: u32 = parse_num(key, value)?;
                self.pass_deadline_ms = (ms != 0).then_some(ms);
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_num::<u8>(key, value).map(|v| v != 0)
}

fn parse_num<T: core::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Syntax(static_key(key)))
}

/// Map a known key to a `'static` name for error reporting.
fn static_key(key: &str) -> &'static str {
    const KEYS: [&str; 9] = [
        "enable_rdm",
        "rdm_discovery_at_startup",
        "rdm_port",
        "rdm_uid",
        "rdm_probe_timeout_us",
        "rdm_mute_timeout_us",
        "rdm_probe_attempts",
        "rdm_max_iterations",
        "rdm_pass_deadline_ms",
    ];
    KEYS.into_iter().find(|k| *k == key).unwrap_or("parameter")
}
