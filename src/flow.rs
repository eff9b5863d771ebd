//! Flow - one conntrack table entry and its attribute codec.
//!
//! Decode walks the top-level attribute list once and dispatches every
//! attribute on its type. Encode emits the attributes the kernel accepts
//! on create/update, in a fixed order:
//!
//! ```text
//! TUPLE_ORIG, TUPLE_REPLY            required
//! TIMEOUT, STATUS, MARK, ZONE        when non-zero
//! PROTOINFO, HELP, TUPLE_MASTER,
//! SEQ_ADJ_ORIG, SEQ_ADJ_REPLY,
//! SYNPROXY                           when filled
//! ```
//!
//! ID, USE, LABELS, LABELS_MASK, COUNTERS_*, SECCTX and TIMESTAMP are
//! produced by the kernel; they are decoded but never encoded.
//!
//! # Example
//!
//! ```
//! use std::net::{IpAddr, Ipv4Addr};
//! use conntrack_codec::codec::status::flags;
//! use conntrack_codec::Flow;
//!
//! let flow = Flow::new(
//!     6,
//!     flags::ASSURED,
//!     IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
//!     IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
//!     1234,
//!     80,
//!     120,
//!     0,
//! );
//!
//! let attrs = flow.encode().unwrap();
//! let decoded = Flow::decode(&attrs).unwrap();
//! assert_eq!(decoded.tuple_reply.proto.source_port, 80);
//! assert_eq!(decoded.timeout, 120);
//! ```

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::codec::{
    AttributeCodec, Counter, Helper, Num16, Num32, ProtoInfo, SecurityContext, SequenceAdjust,
    Status, SynProxy, Timestamp, Tuple,
};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::AttributeType;

/// Snapshot of one conntrack connection.
///
/// `labels_mask` is only meaningful on requests and must be exactly as
/// wide as `labels`; the codec does not check this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    /// Kernel-assigned id (CTA_ID).
    pub id: u32,
    /// Seconds until the entry expires.
    pub timeout: u32,
    pub timestamp: Timestamp,

    pub status: Status,
    pub proto_info: ProtoInfo,
    pub helper: Helper,

    pub zone: u16,

    pub counters_orig: Counter,
    pub counters_reply: Counter,

    pub security_context: SecurityContext,

    pub tuple_orig: Tuple,
    pub tuple_reply: Tuple,
    pub tuple_master: Tuple,

    pub seq_adj_orig: SequenceAdjust,
    pub seq_adj_reply: SequenceAdjust,

    pub labels: Vec<u8>,
    pub labels_mask: Vec<u8>,

    /// Connection mark.
    pub mark: u32,
    /// Kernel refcount (CTA_USE).
    pub use_count: u32,

    pub synproxy: SynProxy,
}

impl Flow {
    /// Build the minimum Flow needed to create a kernel entry.
    ///
    /// The reply tuple is the original tuple with source and destination
    /// swapped. Addresses of different families are only rejected by
    /// [`Flow::encode`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        protocol: u8,
        status: u32,
        source: IpAddr,
        destination: IpAddr,
        source_port: u16,
        destination_port: u16,
        timeout: u32,
        mark: u32,
    ) -> Self {
        let tuple_orig = Tuple::new(protocol, source, destination, source_port, destination_port);

        Self {
            status: Status::new(status),
            timeout,
            mark,
            tuple_orig,
            tuple_reply: tuple_orig.reversed(),
            ..Default::default()
        }
    }

    /// Decode a Flow from a message's top-level attributes.
    ///
    /// Stops at the first unknown attribute type or malformed value.
    pub fn decode(attrs: &[Attribute]) -> Result<Self> {
        let mut f = Self::default();

        for attr in attrs {
            match AttributeType::try_from(attr.kind)? {
                AttributeType::Timeout => f.timeout = attr.uint32()?,
                AttributeType::Id => f.id = attr.uint32()?,
                AttributeType::Use => f.use_count = attr.uint32()?,
                AttributeType::Mark => f.mark = attr.uint32()?,
                AttributeType::Zone => f.zone = attr.uint16()?,
                AttributeType::Labels => f.labels = attr.bytes().to_vec(),
                AttributeType::LabelsMask => f.labels_mask = attr.bytes().to_vec(),
                AttributeType::TupleOrig => f.tuple_orig = Tuple::decode(attr)?,
                AttributeType::TupleReply => f.tuple_reply = Tuple::decode(attr)?,
                AttributeType::TupleMaster => f.tuple_master = Tuple::decode(attr)?,
                AttributeType::Status => f.status = Status::decode(attr)?,
                AttributeType::ProtoInfo => f.proto_info = ProtoInfo::decode(attr)?,
                AttributeType::Help => f.helper = Helper::decode(attr)?,
                AttributeType::CountersOrig => f.counters_orig = Counter::decode(attr)?,
                AttributeType::CountersReply => f.counters_reply = Counter::decode(attr)?,
                AttributeType::SecCtx => f.security_context = SecurityContext::decode(attr)?,
                AttributeType::Timestamp => f.timestamp = Timestamp::decode(attr)?,
                AttributeType::SeqAdjOrig => f.seq_adj_orig = SequenceAdjust::decode(attr)?,
                AttributeType::SeqAdjReply => f.seq_adj_reply = SequenceAdjust::decode(attr)?,
                AttributeType::SynProxy => f.synproxy = SynProxy::decode(attr)?,
            }
        }

        Ok(f)
    }

    /// Encode the Flow into a top-level attribute list.
    pub fn encode(&self) -> Result<Vec<Attribute>> {
        // Every entry sent to the kernel needs both directions.
        if !self.tuple_orig.filled() || !self.tuple_reply.filled() {
            return Err(ConntrackError::NeedTuples);
        }

        let mut attrs = Vec::with_capacity(12);
        attrs.push(self.tuple_orig.encode(AttributeType::TupleOrig)?);
        attrs.push(self.tuple_reply.encode(AttributeType::TupleReply)?);

        if self.timeout != 0 {
            attrs.push(Num32::new(self.timeout).encode(AttributeType::Timeout));
        }
        if self.status.filled() {
            attrs.push(self.status.encode(AttributeType::Status)?);
        }
        if self.mark != 0 {
            attrs.push(Num32::new(self.mark).encode(AttributeType::Mark));
        }
        if self.zone != 0 {
            attrs.push(Num16::new(self.zone).encode(AttributeType::Zone));
        }

        if self.proto_info.filled() {
            attrs.push(self.proto_info.encode(AttributeType::ProtoInfo)?);
        }
        if self.helper.filled() {
            attrs.push(self.helper.encode(AttributeType::Help)?);
        }
        if self.tuple_master.filled() {
            attrs.push(self.tuple_master.encode(AttributeType::TupleMaster)?);
        }
        if self.seq_adj_orig.filled() {
            attrs.push(self.seq_adj_orig.encode(AttributeType::SeqAdjOrig)?);
        }
        if self.seq_adj_reply.filled() {
            attrs.push(self.seq_adj_reply.encode(AttributeType::SeqAdjReply)?);
        }
        if self.synproxy.filled() {
            attrs.push(self.synproxy.encode(AttributeType::SynProxy)?);
        }

        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::status::flags;
    use crate::codec::ProtoInfoTcp;
    use crate::types::protocol;
    use std::net::Ipv4Addr;

    fn v4(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn sample_flow() -> Flow {
        Flow::new(
            protocol::TCP,
            flags::ASSURED | flags::CONFIRMED,
            v4(1),
            v4(2),
            1234,
            80,
            120,
            7,
        )
    }

    fn kinds(attrs: &[Attribute]) -> Vec<u16> {
        attrs.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_new_inverts_reply_tuple() {
        let f = sample_flow();

        assert_eq!(f.tuple_orig.ip.source_address, Some(v4(1)));
        assert_eq!(f.tuple_orig.ip.destination_address, Some(v4(2)));
        assert_eq!(f.tuple_orig.proto.source_port, 1234);
        assert_eq!(f.tuple_orig.proto.destination_port, 80);

        assert_eq!(f.tuple_reply.ip.source_address, Some(v4(2)));
        assert_eq!(f.tuple_reply.ip.destination_address, Some(v4(1)));
        assert_eq!(f.tuple_reply.proto.source_port, 80);
        assert_eq!(f.tuple_reply.proto.destination_port, 1234);
        assert_eq!(f.tuple_reply.proto.protocol, protocol::TCP);

        assert_eq!(f.status.value, flags::ASSURED | flags::CONFIRMED);
        assert_eq!(f.timeout, 120);
        assert_eq!(f.mark, 7);
        assert!(!f.tuple_master.filled());
    }

    #[test]
    fn test_encode_requires_tuples() {
        let mut f = Flow::default();
        assert_eq!(f.encode().unwrap_err(), ConntrackError::NeedTuples);

        f.tuple_orig = Tuple::new(protocol::UDP, v4(1), v4(2), 1, 2);
        assert_eq!(f.encode().unwrap_err(), ConntrackError::NeedTuples);

        f.tuple_reply = f.tuple_orig.reversed();
        assert!(f.encode().is_ok());
    }

    #[test]
    fn test_encode_minimal_flow_has_only_tuples() {
        let mut f = Flow::default();
        f.tuple_orig = Tuple::new(protocol::UDP, v4(1), v4(2), 1, 2);
        f.tuple_reply = f.tuple_orig.reversed();

        let attrs = f.encode().unwrap();
        assert_eq!(
            kinds(&attrs),
            vec![AttributeType::TupleOrig.code(), AttributeType::TupleReply.code()]
        );
    }

    #[test]
    fn test_encode_order() {
        let mut f = sample_flow();
        f.zone = 3;
        f.proto_info = ProtoInfo::Tcp(ProtoInfoTcp {
            state: 3,
            ..Default::default()
        });
        f.helper.name = "ftp".to_string();
        f.tuple_master = Tuple::new(protocol::TCP, v4(9), v4(8), 21, 2121);
        f.seq_adj_orig.offset_after = 4;
        f.seq_adj_reply.offset_before = -4;
        f.synproxy.isn = 99;

        let expected: Vec<u16> = [
            AttributeType::TupleOrig,
            AttributeType::TupleReply,
            AttributeType::Timeout,
            AttributeType::Status,
            AttributeType::Mark,
            AttributeType::Zone,
            AttributeType::ProtoInfo,
            AttributeType::Help,
            AttributeType::TupleMaster,
            AttributeType::SeqAdjOrig,
            AttributeType::SeqAdjReply,
            AttributeType::SynProxy,
        ]
        .iter()
        .map(|k| k.code())
        .collect();

        assert_eq!(kinds(&f.encode().unwrap()), expected);
    }

    #[test]
    fn test_encode_drops_kernel_only_fields() {
        let mut f = sample_flow();
        f.id = 1;
        f.use_count = 2;
        f.labels = vec![0xFF; 16];
        f.labels_mask = vec![0x0F; 16];
        f.counters_orig.packets = 5;
        f.security_context.name = "ctx".to_string();
        f.timestamp.start = 1;

        let attrs = f.encode().unwrap();
        assert_eq!(attrs.len(), 5);
        for kind in [
            AttributeType::Id,
            AttributeType::Use,
            AttributeType::Labels,
            AttributeType::LabelsMask,
            AttributeType::CountersOrig,
            AttributeType::SecCtx,
            AttributeType::Timestamp,
        ] {
            assert!(!kinds(&attrs).contains(&kind.code()));
        }
    }

    #[test]
    fn test_encode_propagates_tuple_error() {
        let f = Flow::new(protocol::TCP, 0, v4(1), "::1".parse().unwrap(), 1, 2, 0, 0);
        assert!(matches!(
            f.encode().unwrap_err(),
            ConntrackError::InvalidAddressFamily { .. }
        ));
    }

    #[test]
    fn test_decode_scalars() {
        let mut attrs = sample_flow().encode().unwrap();
        attrs.push(Attribute::u32(AttributeType::Id.code(), 0xABCD));
        attrs.push(Attribute::u32(AttributeType::Use.code(), 1));
        attrs.push(Attribute::new(AttributeType::Labels.code(), vec![1, 2, 3, 4]));
        attrs.push(Attribute::new(AttributeType::LabelsMask.code(), vec![0, 0, 0, 1]));

        let f = Flow::decode(&attrs).unwrap();
        assert_eq!(f.id, 0xABCD);
        assert_eq!(f.use_count, 1);
        assert_eq!(f.labels, vec![1, 2, 3, 4]);
        assert_eq!(f.labels_mask, vec![0, 0, 0, 1]);
        assert_eq!(f.mark, 7);
    }

    #[test]
    fn test_decode_order_independent() {
        let mut attrs = sample_flow().encode().unwrap();
        attrs.reverse();
        assert_eq!(Flow::decode(&attrs).unwrap(), sample_flow());
    }

    #[test]
    fn test_decode_unknown_attribute_anywhere() {
        let base = sample_flow().encode().unwrap();
        for position in 0..=base.len() {
            let mut attrs = base.clone();
            attrs.insert(position, Attribute::u32(6, 0));
            assert_eq!(
                Flow::decode(&attrs).unwrap_err(),
                ConntrackError::UnknownAttribute(6)
            );
        }
    }

    #[test]
    fn test_decode_propagates_sub_entity_error() {
        let attrs = vec![Attribute::nested(
            AttributeType::CountersOrig.code(),
            vec![Attribute::u8(1, 0)],
        )];
        assert!(matches!(
            Flow::decode(&attrs).unwrap_err(),
            ConntrackError::Malformed { .. }
        ));
    }

    #[test]
    fn test_decode_bad_scalar_size() {
        let attrs = vec![Attribute::u32(AttributeType::Zone.code(), 1)];
        assert!(Flow::decode(&attrs).is_err());
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(Flow::decode(&[]).unwrap(), Flow::default());
    }
}
