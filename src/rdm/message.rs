//! RDM message framing for the discovery command set.
//!
//! Wire format (E1.20 §6.2):
//! ```text
//! ┌────┬────┬─────┬──────────┬──────────┬────┬──────┬───────┬────────┬────┬─────┬─────┬──────┬──────────┐
//! │0xCC│0x01│ len │ dest UID │ src UID  │ TN │ port │ count │ subdev │ CC │ PID │ PDL │  PD  │ checksum │
//! │    │    │     │ 6 B      │ 6 B      │    │ /rsp │       │ 2 B    │    │ 2 B │     │ PDL  │ 2 B BE   │
//! └────┴────┴─────┴──────────┴──────────┴────┴──────┴───────┴────────┴────┴─────┴─────┴──────┴──────────┘
//! ```
//!
//! `len` counts from the start code through the last PD byte; the checksum
//! is the 16-bit sum of those same bytes.

use super::uid::{Uid, UidRange};
use super::{
    DISCOVERY_COMMAND, DISCOVERY_COMMAND_RESPONSE, MAX_DISCOVERY_MESSAGE_SIZE, MAX_DISCOVERY_PDL,
    PID_DISC_MUTE, PID_DISC_UN_MUTE, PID_DISC_UNIQUE_BRANCH, RDM_HEADER_SIZE, RESPONSE_TYPE_ACK,
    SC_RDM, SC_SUB_MESSAGE, UID_SIZE,
};

/// An encoded message ready for the transport.
pub type Frame = heapless::Vec<u8, MAX_DISCOVERY_MESSAGE_SIZE>;

/// Fixed header fields of an RDM message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub destination: Uid,
    pub source: Uid,
    pub transaction: u8,
    /// Port ID on requests, response type on responses.
    pub port_or_response: u8,
    pub message_count: u8,
    pub sub_device: u16,
    pub command_class: u8,
    pub pid: u16,
}

/// Encode a message.  `None` if `pd` exceeds the discovery PD limit.
pub fn encode(header: &MessageHeader, pd: &[u8]) -> Option<Frame> {
    if pd.len() > MAX_DISCOVERY_PDL {
        return None;
    }
    let len = RDM_HEADER_SIZE + pd.len();

    let mut frame = Frame::new();
    frame.extend_from_slice(&[SC_RDM, SC_SUB_MESSAGE, len as u8]).ok()?;
    frame.extend_from_slice(&header.destination.to_bytes()).ok()?;
    frame.extend_from_slice(&header.source.to_bytes()).ok()?;
    frame
        .extend_from_slice(&[
            header.transaction,
            header.port_or_response,
            header.message_count,
        ])
        .ok()?;
    frame.extend_from_slice(&header.sub_device.to_be_bytes()).ok()?;
    frame.push(header.command_class).ok()?;
    frame.extend_from_slice(&header.pid.to_be_bytes()).ok()?;
    frame.push(pd.len() as u8).ok()?;
    frame.extend_from_slice(pd).ok()?;

    let checksum = checksum(&frame);
    frame.extend_from_slice(&checksum.to_be_bytes()).ok()?;
    Some(frame)
}

/// Validate framing and checksum, returning the header and parameter data.
pub fn decode(bytes: &[u8]) -> Option<(MessageHeader, &[u8])> {
    if bytes.len() < RDM_HEADER_SIZE + 2 || bytes[0] != SC_RDM || bytes[1] != SC_SUB_MESSAGE {
        return None;
    }
    let len = usize::from(bytes[2]);
    if len < RDM_HEADER_SIZE || bytes.len() < len + 2 {
        return None;
    }
    let pdl = usize::from(bytes[23]);
    if RDM_HEADER_SIZE + pdl != len {
        return None;
    }
    let received = u16::from_be_bytes([bytes[len], bytes[len + 1]]);
    if received != checksum(&bytes[..len]) {
        return None;
    }

    let header = MessageHeader {
        destination: Uid::from_bytes(uid_at(bytes, 3)),
        source: Uid::from_bytes(uid_at(bytes, 9)),
        transaction: bytes[15],
        port_or_response: bytes[16],
        message_count: bytes[17],
        sub_device: u16::from_be_bytes([bytes[18], bytes[19]]),
        command_class: bytes[20],
        pid: u16::from_be_bytes([bytes[21], bytes[22]]),
    };
    Some((header, &bytes[RDM_HEADER_SIZE..len]))
}

fn uid_at(bytes: &[u8], offset: usize) -> [u8; UID_SIZE] {
    let mut uid = [0u8; UID_SIZE];
    uid.copy_from_slice(&bytes[offset..offset + UID_SIZE]);
    uid
}

fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

// ═══════════════════════════════════════════════════════════════
//  Controller-side request builder
// ═══════════════════════════════════════════════════════════════

/// Builds discovery requests on behalf of one controller port.
///
/// Carries the controller's own UID and a wrapping transaction number.
#[derive(Debug, Clone)]
pub struct RdmMessage {
    source: Uid,
    port_id: u8,
    transaction: u8,
}

impl RdmMessage {
    /// `port` is zero-based; the wire port ID is `port + 1`.
    pub fn new(source: Uid, port: u8) -> Self {
        Self {
            source,
            port_id: port.saturating_add(1),
            transaction: 0,
        }
    }

    pub fn source(&self) -> Uid {
        self.source
    }

    pub fn set_source(&mut self, source: Uid) {
        self.source = source;
    }

    pub fn port_id(&self) -> u8 {
        self.port_id
    }

    /// Broadcast `DISC_UNIQUE_BRANCH` over `range`.
    pub fn disc_unique_branch(&mut self, range: UidRange) -> Frame {
        let mut pd = [0u8; 2 * UID_SIZE];
        pd[..UID_SIZE].copy_from_slice(&range.lower().to_bytes());
        pd[UID_SIZE..].copy_from_slice(&range.upper().to_bytes());
        self.request(Uid::BROADCAST, PID_DISC_UNIQUE_BRANCH, &pd).1
    }

    /// Addressed `DISC_MUTE`.  The header is what the ACK must answer.
    pub fn disc_mute(&mut self, uid: Uid) -> (MessageHeader, Frame) {
        self.request(uid, PID_DISC_MUTE, &[])
    }

    /// `DISC_UN_MUTE`, addressed or to [`Uid::BROADCAST`].
    pub fn disc_un_mute(&mut self, uid: Uid) -> (MessageHeader, Frame) {
        self.request(uid, PID_DISC_UN_MUTE, &[])
    }

    fn request(&mut self, destination: Uid, pid: u16, pd: &[u8]) -> (MessageHeader, Frame) {
        let header = MessageHeader {
            destination,
            source: self.source,
            transaction: self.transaction,
            port_or_response: self.port_id,
            message_count: 0,
            sub_device: 0,
            command_class: DISCOVERY_COMMAND,
            pid,
        };
        self.transaction = self.transaction.wrapping_add(1);
        // Discovery PDs are at most two UIDs, which always fits.
        (header, encode(&header, pd).unwrap_or_default())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Mute / un-mute acknowledgements
// ═══════════════════════════════════════════════════════════════

/// Decoded `DISC_MUTE` / `DISC_UN_MUTE` acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteAck {
    /// Control field bits (managed proxy, sub-devices, boot-loader, proxied).
    pub control_field: u16,
    /// Primary UID of a multi-port responder, when reported.
    pub binding_uid: Option<Uid>,
}

/// Accept only a checksum-valid ACK that answers `request`: same PID and
/// transaction number, sent by the addressed device back to the controller.
pub fn parse_mute_ack(bytes: &[u8], request: &MessageHeader) -> Option<MuteAck> {
    let (header, pd) = decode(bytes)?;
    if header.command_class != DISCOVERY_COMMAND_RESPONSE
        || header.port_or_response != RESPONSE_TYPE_ACK
        || !matches!(header.pid, PID_DISC_MUTE | PID_DISC_UN_MUTE)
        || header.pid != request.pid
        || header.transaction != request.transaction
        || header.source != request.destination
        || header.destination != request.source
    {
        return None;
    }
    let control_field = match pd {
        [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
        _ => 0,
    };
    let binding_uid = pd
        .get(2..2 + UID_SIZE)
        .map(|b| Uid::from_bytes(uid_at(b, 0)));
    Some(MuteAck {
        control_field,
        binding_uid,
    })
}

/// Responder-side mute acknowledgement, as a device would answer `request`.
pub fn encode_mute_ack(request: &MessageHeader, responder: Uid, control_field: u16) -> Frame {
    let header = MessageHeader {
        destination: request.source,
        source: responder,
        transaction: request.transaction,
        port_or_response: RESPONSE_TYPE_ACK,
        message_count: 0,
        sub_device: 0,
        command_class: DISCOVERY_COMMAND_RESPONSE,
        pid: request.pid,
    };
    encode(&header, &control_field.to_be_bytes()).unwrap_or_default()
}
