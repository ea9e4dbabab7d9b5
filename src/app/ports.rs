//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DiscoveryEngine / RdmService (domain)
//! ```
//!
//! Driven adapters (RS-485 transport, clock, event sinks, config storage)
//! implement these traits.  The engine and service consume them via
//! generics, so the discovery core never touches hardware directly and
//! several engines (one per physical port) can coexist.

use core::time::Duration;

use crate::config::DiscoveryConfig;

use super::events::DiscoveryEvent;

// ───────────────────────────────────────────────────────────────
// RDM transport port (driven adapter: domain ↔ RS-485 bus)
// ───────────────────────────────────────────────────────────────

/// One blocking, half-duplex request/response round-trip on the bus.
///
/// The engine is the sole user of the transport for the duration of a
/// discovery pass; keeping other RDM traffic off the bus meanwhile is the
/// caller's job.
pub trait RdmTransport {
    /// Send `request` (BREAK, MAB and framing are the adapter's concern)
    /// and wait up to `timeout` for a reply.
    ///
    /// Returns the raw reply bytes, or `None` when nothing arrived in time.
    /// Hardware faults are reported as `None`; the adapter logs them.
    fn send_and_wait(&mut self, request: &[u8], timeout: Duration) -> Option<&[u8]>;
}

impl<T: RdmTransport + ?Sized> RdmTransport for &mut T {
    fn send_and_wait(&mut self, request: &[u8], timeout: Duration) -> Option<&[u8]> {
        (**self).send_and_wait(request, timeout)
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: system timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source used for the pass deadline.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin.
    fn now_us(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / bridge)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DiscoveryEvent`]s through this port.
/// Adapters decide where they go (serial log, Art-Net RDM reply, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &DiscoveryEvent);
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &DiscoveryEvent) {}
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists discovery configuration.
///
/// Implementations MUST call [`DiscoveryConfig::validate`] before
/// persisting; invalid values are rejected, not clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`DiscoveryConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<DiscoveryConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DiscoveryConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations and parameter parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// A parameter line could not be parsed.
    Syntax(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Syntax(key) => write!(f, "bad value for '{}'", key),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::ValidationFailed(msg) | ConfigError::Syntax(msg) => Self::Config(msg),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}
