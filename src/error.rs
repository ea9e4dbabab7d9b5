//! Unified error types for the RDM discovery firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform. All variants are `Copy`
//! so they can be carried inside discovery events and stats without
//! allocation.
//!
//! Nothing in the discovery core is fatal: every [`DiscoveryError`] degrades
//! to "fewer devices found" or "pass incomplete".

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A discovery probe or pass degraded.
    Discovery(DiscoveryError),
    /// The RS-485 transport failed at the hardware level.
    Transport(TransportError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery(e) => write!(f, "discovery: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Failure taxonomy of a discovery probe or pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryError {
    /// No bytes within the per-probe deadline (retried, then `NoResponse`).
    Timeout,
    /// Framing or checksum failure in a discovery response.
    Malformed,
    /// Two or more responders answered at once.  Drives bisection.
    Collision,
    /// A device was identified but never acknowledged `DISC_MUTE`.
    MuteAckFailed,
    /// A device answered again after it had been recorded and muted.
    Reanswered,
    /// The iteration count or wall-clock budget ran out.
    BudgetExhausted,
    /// The pending-range stack hit its fixed capacity.
    WorklistOverflow,
    /// The table of devices is full.
    TodFull,
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "response timeout"),
            Self::Malformed => write!(f, "malformed response"),
            Self::Collision => write!(f, "response collision"),
            Self::MuteAckFailed => write!(f, "mute not acknowledged"),
            Self::Reanswered => write!(f, "device answered after mute"),
            Self::BudgetExhausted => write!(f, "pass budget exhausted"),
            Self::WorklistOverflow => write!(f, "worklist overflow"),
            Self::TodFull => write!(f, "table of devices full"),
        }
    }
}

impl From<DiscoveryError> for Error {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The RS-485 driver-enable line could not be switched.
    DirectionPin,
    /// The UART refused to generate the BREAK / mark-after-break.
    Break,
    /// Writing the request frame failed or was short.
    Write,
    /// Reading the response failed at the driver level.
    Read,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectionPin => write!(f, "driver-enable pin failed"),
            Self::Break => write!(f, "break generation failed"),
            Self::Write => write!(f, "UART write failed"),
            Self::Read => write!(f, "UART read failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
