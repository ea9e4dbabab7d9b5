//! RDM (ANSI E1.20) wire-level building blocks used by discovery.
//!
//! ```text
//!   uid ──▶ message (requests out) ──▶ transport ──▶ response (validator)
//!                                                        │
//!                                                        ▼
//!                                                       tod
//! ```
//!
//! Only the discovery command set is modelled here: `DISC_UNIQUE_BRANCH`,
//! `DISC_MUTE` and `DISC_UN_MUTE`.

pub mod message;
pub mod response;
pub mod tod;
pub mod uid;

pub use response::{DiscoveryResult, classify};
pub use tod::{Tod, TodEntry, TodFull};
pub use uid::{Uid, UidParseError, UidRange};

/// Size of a UID on the wire.
pub const UID_SIZE: usize = 6;

// ── Start codes ───────────────────────────────────────────────

pub const SC_RDM: u8 = 0xCC;
pub const SC_SUB_MESSAGE: u8 = 0x01;

// ── Discovery response framing ────────────────────────────────

pub const PREAMBLE_BYTE: u8 = 0xFE;
pub const SEPARATOR_BYTE: u8 = 0xAA;
/// Maximum number of preamble bytes a responder may send.
pub const MAX_PREAMBLE_LEN: usize = 7;
/// Encoded UID (12) plus encoded checksum (4), excluding preamble/separator.
pub const DISCOVERY_RESPONSE_SIZE: usize = 16;
/// Longest discovery response including a full preamble and the separator.
pub const MAX_DISCOVERY_RESPONSE_SIZE: usize = DISCOVERY_RESPONSE_SIZE + MAX_PREAMBLE_LEN + 1;

// ── Command classes ───────────────────────────────────────────

pub const DISCOVERY_COMMAND: u8 = 0x10;
pub const DISCOVERY_COMMAND_RESPONSE: u8 = 0x11;

// ── Parameter IDs ─────────────────────────────────────────────

pub const PID_DISC_UNIQUE_BRANCH: u16 = 0x0001;
pub const PID_DISC_MUTE: u16 = 0x0002;
pub const PID_DISC_UN_MUTE: u16 = 0x0003;

// ── Response types ────────────────────────────────────────────

pub const RESPONSE_TYPE_ACK: u8 = 0x00;

/// RDM message header length (start code through PDL).
pub const RDM_HEADER_SIZE: usize = 24;
/// Largest parameter data block used by discovery (two UIDs).
pub const MAX_DISCOVERY_PDL: usize = 2 * UID_SIZE;
/// Largest discovery-class message including the checksum.
pub const MAX_DISCOVERY_MESSAGE_SIZE: usize = RDM_HEADER_SIZE + MAX_DISCOVERY_PDL + 2;
