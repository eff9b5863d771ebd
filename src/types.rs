//! Conntrack netlink constants.
//!
//! Numeric codes from the kernel's `nfnetlink_conntrack.h`. Top-level
//! attribute types are an enum so Flow decode can dispatch on them; nested
//! sub-attribute codes are plain constants grouped per attribute group.

use crate::error::ConntrackError;

/// ctnetlink subsystem id.
pub const NFNL_SUBSYS_CTNETLINK: u8 = 1;

/// Protocol families carried in `nfgenmsg`.
pub mod family {
    /// Any family.
    pub const UNSPEC: u8 = 0;
    /// IPv4.
    pub const INET: u8 = 2;
    /// IPv6.
    pub const INET6: u8 = 10;
}

/// ctnetlink message types.
pub mod message_type {
    /// Create/update an entry, or a new/update event.
    pub const NEW: u8 = 0;
    /// Query (or dump) entries.
    pub const GET: u8 = 1;
    /// Delete an entry, or a destroy event.
    pub const DELETE: u8 = 2;
}

/// IP protocol numbers with protocol-specific handling in the codec.
pub mod protocol {
    /// ICMP.
    pub const ICMP: u8 = 1;
    /// TCP.
    pub const TCP: u8 = 6;
    /// UDP.
    pub const UDP: u8 = 17;
    /// DCCP.
    pub const DCCP: u8 = 33;
    /// ICMPv6.
    pub const ICMPV6: u8 = 58;
    /// SCTP.
    pub const SCTP: u8 = 132;
}

/// Top-level conntrack attribute types understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AttributeType {
    /// CTA_TUPLE_ORIG
    TupleOrig = 1,
    /// CTA_TUPLE_REPLY
    TupleReply = 2,
    /// CTA_STATUS
    Status = 3,
    /// CTA_PROTOINFO
    ProtoInfo = 4,
    /// CTA_HELP
    Help = 5,
    /// CTA_TIMEOUT
    Timeout = 7,
    /// CTA_MARK
    Mark = 8,
    /// CTA_COUNTERS_ORIG
    CountersOrig = 9,
    /// CTA_COUNTERS_REPLY
    CountersReply = 10,
    /// CTA_USE
    Use = 11,
    /// CTA_ID
    Id = 12,
    /// CTA_TUPLE_MASTER
    TupleMaster = 14,
    /// CTA_SEQ_ADJ_ORIG
    SeqAdjOrig = 15,
    /// CTA_SEQ_ADJ_REPLY
    SeqAdjReply = 16,
    /// CTA_ZONE
    Zone = 18,
    /// CTA_SECCTX
    SecCtx = 19,
    /// CTA_TIMESTAMP
    Timestamp = 20,
    /// CTA_LABELS
    Labels = 22,
    /// CTA_LABELS_MASK
    LabelsMask = 23,
    /// CTA_SYNPROXY
    SynProxy = 24,
}

impl AttributeType {
    /// Wire value of this attribute type.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl From<AttributeType> for u16 {
    fn from(kind: AttributeType) -> Self {
        kind.code()
    }
}

impl TryFrom<u16> for AttributeType {
    type Error = ConntrackError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Self::TupleOrig,
            2 => Self::TupleReply,
            3 => Self::Status,
            4 => Self::ProtoInfo,
            5 => Self::Help,
            7 => Self::Timeout,
            8 => Self::Mark,
            9 => Self::CountersOrig,
            10 => Self::CountersReply,
            11 => Self::Use,
            12 => Self::Id,
            14 => Self::TupleMaster,
            15 => Self::SeqAdjOrig,
            16 => Self::SeqAdjReply,
            18 => Self::Zone,
            19 => Self::SecCtx,
            20 => Self::Timestamp,
            22 => Self::Labels,
            23 => Self::LabelsMask,
            24 => Self::SynProxy,
            other => return Err(ConntrackError::UnknownAttribute(other)),
        })
    }
}

/// CTA_TUPLE_* children.
pub mod tuple {
    pub const IP: u16 = 1;
    pub const PROTO: u16 = 2;
    pub const ZONE: u16 = 3;
}

/// CTA_IP_* children of CTA_TUPLE_IP.
pub mod ip {
    pub const V4_SRC: u16 = 1;
    pub const V4_DST: u16 = 2;
    pub const V6_SRC: u16 = 3;
    pub const V6_DST: u16 = 4;
}

/// CTA_PROTO_* children of CTA_TUPLE_PROTO.
pub mod proto {
    pub const NUM: u16 = 1;
    pub const SRC_PORT: u16 = 2;
    pub const DST_PORT: u16 = 3;
    pub const ICMP_ID: u16 = 4;
    pub const ICMP_TYPE: u16 = 5;
    pub const ICMP_CODE: u16 = 6;
    pub const ICMPV6_ID: u16 = 7;
    pub const ICMPV6_TYPE: u16 = 8;
    pub const ICMPV6_CODE: u16 = 9;
}

/// CTA_PROTOINFO_* children.
pub mod protoinfo {
    pub const TCP: u16 = 1;
    pub const DCCP: u16 = 2;
    pub const SCTP: u16 = 3;
}

/// CTA_PROTOINFO_TCP_* children.
pub mod protoinfo_tcp {
    pub const STATE: u16 = 1;
    pub const WSCALE_ORIGINAL: u16 = 2;
    pub const WSCALE_REPLY: u16 = 3;
    pub const FLAGS_ORIGINAL: u16 = 4;
    pub const FLAGS_REPLY: u16 = 5;
}

/// CTA_PROTOINFO_DCCP_* children.
pub mod protoinfo_dccp {
    pub const STATE: u16 = 1;
    pub const ROLE: u16 = 2;
    pub const HANDSHAKE_SEQ: u16 = 3;
    pub const PAD: u16 = 4;
}

/// CTA_PROTOINFO_SCTP_* children.
pub mod protoinfo_sctp {
    pub const STATE: u16 = 1;
    pub const VTAG_ORIGINAL: u16 = 2;
    pub const VTAG_REPLY: u16 = 3;
}

/// CTA_COUNTERS_* children.
pub mod counters {
    pub const PACKETS: u16 = 1;
    pub const BYTES: u16 = 2;
    pub const PACKETS32: u16 = 3;
    pub const BYTES32: u16 = 4;
    pub const PAD: u16 = 5;
}

/// CTA_TIMESTAMP_* children.
pub mod timestamp {
    pub const START: u16 = 1;
    pub const STOP: u16 = 2;
    pub const PAD: u16 = 3;
}

/// CTA_HELP_* children.
pub mod help {
    pub const NAME: u16 = 1;
    pub const INFO: u16 = 2;
}

/// CTA_SECCTX_* children.
pub mod secctx {
    pub const NAME: u16 = 1;
}

/// CTA_SEQADJ_* children.
pub mod seqadj {
    pub const CORRECTION_POS: u16 = 1;
    pub const OFFSET_BEFORE: u16 = 2;
    pub const OFFSET_AFTER: u16 = 3;
}

/// CTA_SYNPROXY_* children.
pub mod synproxy {
    pub const ISN: u16 = 1;
    pub const ITS: u16 = 2;
    pub const TSOFF: u16 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_codes() {
        assert_eq!(AttributeType::TupleOrig.code(), 1);
        assert_eq!(AttributeType::Timeout.code(), 7);
        assert_eq!(AttributeType::Zone.code(), 18);
        assert_eq!(AttributeType::SynProxy.code(), 24);
        assert_eq!(u16::from(AttributeType::LabelsMask), 23);
    }

    #[test]
    fn test_known_codes_convert_back() {
        for code in [1u16, 2, 3, 4, 5, 7, 8, 9, 10, 11, 12, 14, 15, 16, 18, 19, 20, 22, 23, 24] {
            let kind = AttributeType::try_from(code).unwrap();
            assert_eq!(kind.code(), code);
        }
    }

    #[test]
    fn test_unused_kernel_codes_rejected() {
        // NAT_SRC, NAT_DST, SECMARK, MARK_MASK, FILTER, STATUS_MASK
        for code in [0u16, 6, 13, 17, 21, 25, 26, 999] {
            assert_eq!(
                AttributeType::try_from(code),
                Err(ConntrackError::UnknownAttribute(code))
            );
        }
    }
}
