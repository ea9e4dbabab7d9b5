//! Discovery-response validator.
//!
//! Wire format of a `DISC_UNIQUE_BRANCH` response (no break, no start code):
//! ```text
//! ┌──────────────┬──────┬──────────────────────┬─────────────────┐
//! │ 0–7 × 0xFE   │ 0xAA │ EUID: 6 byte pairs   │ ECS: 2 pairs    │
//! │ preamble     │ sep  │ (x|0xAA, x|0x55)     │ (x|0xAA, x|0x55)│
//! └──────────────┴──────┴──────────────────────┴─────────────────┘
//! ```
//!
//! Every data byte `x` is sent twice, once with the odd bits forced high
//! and once with the even bits forced high, so each pair carries
//! complementary masks and `x = a & b`.  Two responders talking at once
//! garble every byte where their frames disagree, which almost always
//! clears one of the forced bits.  That is why the pair check runs over all
//! six UID pairs before the checksum is looked at.

use super::uid::Uid;
use super::{
    DISCOVERY_RESPONSE_SIZE, MAX_DISCOVERY_RESPONSE_SIZE, MAX_PREAMBLE_LEN, PREAMBLE_BYTE,
    SEPARATOR_BYTE, UID_SIZE,
};

const ODD_MASK: u8 = 0xAA;
const EVEN_MASK: u8 = 0x55;

/// Outcome of one discovery probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryResult {
    /// Nothing on the bus before the per-probe deadline.
    NoResponse,
    /// Exactly one responder answered.
    SingleUid(Uid),
    /// Some byte pair lost its forced-high bits.
    Collision,
    /// Bad framing, truncation or checksum mismatch.
    Malformed,
}

/// Classify raw response bytes.  `None` means the transport timed out.
pub fn classify(response: Option<&[u8]>) -> DiscoveryResult {
    let bytes = match response {
        None => return DiscoveryResult::NoResponse,
        Some([]) => return DiscoveryResult::NoResponse,
        Some(bytes) => bytes,
    };

    let Some(start) = find_separator(bytes) else {
        return DiscoveryResult::Malformed;
    };
    let Some(body) = bytes.get(start..start + DISCOVERY_RESPONSE_SIZE) else {
        return DiscoveryResult::Malformed;
    };
    let (euid, ecs) = body.split_at(2 * UID_SIZE);

    let mut uid = [0u8; UID_SIZE];
    for (out, pair) in uid.iter_mut().zip(euid.chunks_exact(2)) {
        match decode_pair(pair[0], pair[1]) {
            Some(x) => *out = x,
            None => return DiscoveryResult::Collision,
        }
    }

    let (Some(cs_hi), Some(cs_lo)) = (decode_pair(ecs[0], ecs[1]), decode_pair(ecs[2], ecs[3]))
    else {
        return DiscoveryResult::Collision;
    };
    let received = u16::from_be_bytes([cs_hi, cs_lo]);

    if received != checksum(euid) {
        return DiscoveryResult::Malformed;
    }

    DiscoveryResult::SingleUid(Uid::from_bytes(uid))
}

/// Index of the first byte after the separator.
fn find_separator(bytes: &[u8]) -> Option<usize> {
    let preamble = bytes
        .iter()
        .take(MAX_PREAMBLE_LEN)
        .take_while(|&&b| b == PREAMBLE_BYTE)
        .count();
    (bytes.get(preamble) == Some(&SEPARATOR_BYTE)).then_some(preamble + 1)
}

fn decode_pair(a: u8, b: u8) -> Option<u8> {
    (a & ODD_MASK == ODD_MASK && b & EVEN_MASK == EVEN_MASK).then_some(a & b)
}

/// 16-bit additive checksum over raw (encoded) bytes.
fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Build the frame a responder with `uid` sends back.
///
/// `preamble_len` is clamped to 0–7.
pub fn encode_discovery_response(
    uid: Uid,
    preamble_len: usize,
) -> heapless::Vec<u8, MAX_DISCOVERY_RESPONSE_SIZE> {
    let mut frame = heapless::Vec::new();
    let preamble_len = preamble_len.min(MAX_PREAMBLE_LEN);
    // Capacity covers the longest preamble plus separator plus body.
    for _ in 0..preamble_len {
        let _ = frame.push(PREAMBLE_BYTE);
    }
    let _ = frame.push(SEPARATOR_BYTE);

    let mut euid = [0u8; 2 * UID_SIZE];
    for (pair, x) in euid.chunks_exact_mut(2).zip(uid.to_bytes()) {
        pair[0] = x | ODD_MASK;
        pair[1] = x | EVEN_MASK;
    }
    let _ = frame.extend_from_slice(&euid);

    let [hi, lo] = checksum(&euid).to_be_bytes();
    let _ = frame.extend_from_slice(&[hi | ODD_MASK, hi | EVEN_MASK, lo | ODD_MASK, lo | EVEN_MASK]);
    frame
}
