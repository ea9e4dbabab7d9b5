//! 48-bit RDM unique identifiers and the closed ranges bisected during
//! discovery.
//!
//! A UID is a 16-bit ESTA manufacturer ID followed by a 32-bit device ID,
//! transmitted big-endian.  Display form is `MMMM:DDDDDDDD`.

use core::fmt;
use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::UID_SIZE;

const UID_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// A responder (or controller) UID.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Uid(u64);

impl Uid {
    /// All 48 bits set: addresses every device at once.
    pub const BROADCAST: Self = Self(UID_MASK);
    /// Lowest possible UID.
    pub const MIN: Self = Self(0);
    /// Highest possible UID (numerically equal to [`Uid::BROADCAST`]).
    pub const MAX: Self = Self(UID_MASK);

    pub const fn new(manufacturer_id: u16, device_id: u32) -> Self {
        Self(((manufacturer_id as u64) << 32) | device_id as u64)
    }

    /// Decode a big-endian 6-byte UID.
    pub const fn from_bytes(bytes: [u8; UID_SIZE]) -> Self {
        Self(
            (bytes[0] as u64) << 40
                | (bytes[1] as u64) << 32
                | (bytes[2] as u64) << 24
                | (bytes[3] as u64) << 16
                | (bytes[4] as u64) << 8
                | bytes[5] as u64,
        )
    }

    /// Encode as big-endian 6 bytes.
    pub const fn to_bytes(self) -> [u8; UID_SIZE] {
        let b = self.0.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn manufacturer_id(self) -> u16 {
        (self.0 >> 32) as u16
    }

    pub const fn device_id(self) -> u32 {
        self.0 as u32
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == UID_MASK
    }

    /// Next UID up, `None` at the top of the space.
    pub const fn checked_next(self) -> Option<Self> {
        if self.0 == UID_MASK {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }

    /// Next UID down, `None` at zero.
    pub const fn checked_prev(self) -> Option<Self> {
        if self.0 == 0 {
            None
        } else {
            Some(Self(self.0 - 1))
        }
    }
}

/// Raw value does not fit in 48 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidOutOfRange(pub u64);

impl fmt::Display for UidOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X} exceeds 48 bits", self.0)
    }
}

impl TryFrom<u64> for Uid {
    type Error = UidOutOfRange;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        if raw > UID_MASK {
            Err(UidOutOfRange(raw))
        } else {
            Ok(Self(raw))
        }
    }
}

impl From<Uid> for u64 {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:08X}", self.manufacturer_id(), self.device_id())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({self})")
    }
}

// ── Parsing ───────────────────────────────────────────────────

/// Errors from parsing a textual UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidParseError {
    /// Neither `MMMM:DDDDDDDD` nor 12 bare hex digits.
    BadLength,
    /// A character outside `[0-9A-Fa-f]`.
    BadDigit,
}

impl fmt::Display for UidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength => write!(f, "expected MMMM:DDDDDDDD or 12 hex digits"),
            Self::BadDigit => write!(f, "invalid hex digit"),
        }
    }
}

fn parse_hex(digits: &str) -> Result<u64, UidParseError> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(UidParseError::BadDigit);
    }
    u64::from_str_radix(digits, 16).map_err(|_| UidParseError::BadDigit)
}

impl FromStr for Uid {
    type Err = UidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            Some((mfr, dev)) if mfr.len() == 4 && dev.len() == 8 => {
                Ok(Self((parse_hex(mfr)? << 32) | parse_hex(dev)?))
            }
            Some(_) => Err(UidParseError::BadLength),
            None if s.len() == 12 => Ok(Self(parse_hex(s)?)),
            None => Err(UidParseError::BadLength),
        }
    }
}

// ── Serde: text for JSON, integer for postcard ────────────────

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

struct UidVisitor;

impl Visitor<'_> for UidVisitor {
    type Value = Uid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RDM UID as \"MMMM:DDDDDDDD\" or a 48-bit integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Uid, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Uid, E> {
        Uid::try_from(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(UidVisitor)
        } else {
            deserializer.deserialize_u64(UidVisitor)
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  UidRange
// ═══════════════════════════════════════════════════════════════

/// Closed interval `[lower, upper]` of UIDs still to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidRange {
    lower: Uid,
    upper: Uid,
}

impl UidRange {
    /// The whole 48-bit UID space.
    pub const FULL: Self = Self {
        lower: Uid::MIN,
        upper: Uid::MAX,
    };

    /// `None` when `lower > upper`.
    pub fn new(lower: Uid, upper: Uid) -> Option<Self> {
        (lower <= upper).then_some(Self { lower, upper })
    }

    pub const fn single(uid: Uid) -> Self {
        Self {
            lower: uid,
            upper: uid,
        }
    }

    pub const fn lower(&self) -> Uid {
        self.lower
    }

    pub const fn upper(&self) -> Uid {
        self.upper
    }

    pub fn is_single(&self) -> bool {
        self.lower == self.upper
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.lower <= uid && uid <= self.upper
    }

    /// Number of UIDs covered (never zero).
    pub fn len(&self) -> u64 {
        self.upper.0 - self.lower.0 + 1
    }

    /// Split at `mid = lo + (hi - lo) / 2` into `([lo, mid], [mid + 1, hi])`.
    ///
    /// `None` for a single-UID range.
    pub fn bisect(&self) -> Option<(Self, Self)> {
        if self.is_single() {
            return None;
        }
        let mid = self.lower.0 + (self.upper.0 - self.lower.0) / 2;
        Some((
            Self {
                lower: self.lower,
                upper: Uid(mid),
            },
            Self {
                lower: Uid(mid + 1),
                upper: self.upper,
            },
        ))
    }

    /// The parts of this range strictly below and strictly above `uid`.
    pub fn exclude(&self, uid: Uid) -> (Option<Self>, Option<Self>) {
        if !self.contains(uid) {
            return (Some(*self), None);
        }
        let below = uid
            .checked_prev()
            .and_then(|prev| Self::new(self.lower, prev));
        let above = uid
            .checked_next()
            .and_then(|next| Self::new(next, self.upper));
        (below, above)
    }
}

impl fmt::Display for UidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.lower, self.upper)
    }
}
