//! Connection status bitfield (CTA_STATUS).

use serde::{Deserialize, Serialize};

use super::AttributeCodec;
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::AttributeType;

/// Status flag constants (kernel `IPS_*` bits).
pub mod flags {
    /// Expected connection.
    pub const EXPECTED: u32 = 1 << 0;
    /// Packets seen in both directions.
    pub const SEEN_REPLY: u32 = 1 << 1;
    /// Connection will not be early-dropped.
    pub const ASSURED: u32 = 1 << 2;
    /// Connection confirmed: originating packet has left the box.
    pub const CONFIRMED: u32 = 1 << 3;
    /// Source NAT applied.
    pub const SRC_NAT: u32 = 1 << 4;
    /// Destination NAT applied.
    pub const DST_NAT: u32 = 1 << 5;
    /// Sequence adjustment in progress.
    pub const SEQ_ADJUST: u32 = 1 << 6;
    /// Source NAT setup done.
    pub const SRC_NAT_DONE: u32 = 1 << 7;
    /// Destination NAT setup done.
    pub const DST_NAT_DONE: u32 = 1 << 8;
    /// Connection is being torn down.
    pub const DYING: u32 = 1 << 9;
    /// Timeout is fixed.
    pub const FIXED_TIMEOUT: u32 = 1 << 10;
    /// Template entry.
    pub const TEMPLATE: u32 = 1 << 11;
    /// NAT clash resolution.
    pub const NAT_CLASH: u32 = 1 << 12;
    /// Helper attached explicitly.
    pub const HELPER: u32 = 1 << 13;
    /// Flow offloaded to software fast path.
    pub const OFFLOAD: u32 = 1 << 14;
    /// Flow offloaded to hardware.
    pub const HW_OFFLOAD: u32 = 1 << 15;

    // Common flag combinations

    /// NAT in either direction.
    pub const NAT_MASK: u32 = SRC_NAT | DST_NAT;
    /// NAT setup done in either direction.
    pub const NAT_DONE_MASK: u32 = SRC_NAT_DONE | DST_NAT_DONE;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(value: u32, flag: u32) -> bool {
        value & flag != 0
    }
}

/// Raw connection status word. Bits are transported, never validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    pub value: u32,
}

impl Status {
    #[inline]
    pub fn new(value: u32) -> Self {
        Self { value }
    }

    /// Check if all bits of `flag` are set.
    #[inline]
    pub fn contains(&self, flag: u32) -> bool {
        self.value & flag == flag
    }

    #[inline]
    pub fn expected(&self) -> bool {
        flags::has_flag(self.value, flags::EXPECTED)
    }

    #[inline]
    pub fn seen_reply(&self) -> bool {
        flags::has_flag(self.value, flags::SEEN_REPLY)
    }

    #[inline]
    pub fn assured(&self) -> bool {
        flags::has_flag(self.value, flags::ASSURED)
    }

    #[inline]
    pub fn confirmed(&self) -> bool {
        flags::has_flag(self.value, flags::CONFIRMED)
    }

    #[inline]
    pub fn src_nat(&self) -> bool {
        flags::has_flag(self.value, flags::SRC_NAT)
    }

    #[inline]
    pub fn dst_nat(&self) -> bool {
        flags::has_flag(self.value, flags::DST_NAT)
    }

    #[inline]
    pub fn seq_adjust(&self) -> bool {
        flags::has_flag(self.value, flags::SEQ_ADJUST)
    }

    #[inline]
    pub fn dying(&self) -> bool {
        flags::has_flag(self.value, flags::DYING)
    }

    #[inline]
    pub fn fixed_timeout(&self) -> bool {
        flags::has_flag(self.value, flags::FIXED_TIMEOUT)
    }

    #[inline]
    pub fn offload(&self) -> bool {
        flags::has_flag(self.value, flags::OFFLOAD)
    }
}

impl From<u32> for Status {
    fn from(value: u32) -> Self {
        Self { value }
    }
}

impl AttributeCodec for Status {
    fn decode(attr: &Attribute) -> Result<Self> {
        if attr.nested || attr.data.len() != 4 {
            return Err(ConntrackError::malformed(
                "status",
                format!("expected a 4-byte value, got {} bytes", attr.data.len()),
            ));
        }
        Ok(Self::new(attr.uint32()?))
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        Ok(Attribute::u32(kind.code(), self.value))
    }

    fn filled(&self) -> bool {
        self.value != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decode() {
        let attr = Attribute::u32(3, flags::ASSURED | flags::CONFIRMED);
        let status = Status::decode(&attr).unwrap();

        assert!(status.assured());
        assert!(status.confirmed());
        assert!(!status.seen_reply());
        assert!(status.contains(flags::ASSURED | flags::CONFIRMED));
        assert!(!status.contains(flags::ASSURED | flags::DYING));
    }

    #[test]
    fn test_status_wrong_length() {
        let attr = Attribute::new(3, vec![0, 4]);
        let err = Status::decode(&attr).unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn test_status_encode() {
        let status = Status::new(flags::SEEN_REPLY | flags::DST_NAT);
        let attr = status.encode(AttributeType::Status).unwrap();

        assert_eq!(attr.kind, AttributeType::Status.code());
        assert_eq!(attr.bytes(), &[0, 0, 0, 0x22]);
    }

    #[test]
    fn test_status_filled() {
        assert!(!Status::default().filled());
        assert!(Status::from(flags::EXPECTED).filled());
    }

    #[test]
    fn test_unknown_bits_are_kept() {
        let attr = Attribute::u32(3, 0x8000_0001);
        let status = Status::decode(&attr).unwrap();
        assert_eq!(status.value, 0x8000_0001);
        assert!(status.expected());
    }

    #[test]
    fn test_flag_masks() {
        assert_eq!(flags::NAT_MASK, 0x30);
        assert_eq!(flags::NAT_DONE_MASK, 0x180);
        assert!(flags::has_flag(flags::NAT_MASK, flags::SRC_NAT));
    }
}
