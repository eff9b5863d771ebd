//! Directional connection identity (CTA_TUPLE_ORIG / REPLY / MASTER).
//!
//! Wire layout of a tuple:
//! ```text
//! CTA_TUPLE_*            (nested)
//! ├── CTA_TUPLE_IP       (nested)  V4_SRC/V4_DST (4 bytes) or V6_SRC/V6_DST (16 bytes)
//! ├── CTA_TUPLE_PROTO    (nested)  NUM u8, SRC_PORT/DST_PORT u16, or ICMP id/type/code
//! └── CTA_TUPLE_ZONE     u16, optional
//! ```
//!
//! The address family on the wire follows the address width.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use super::{nested_children, AttributeCodec};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::{ip, proto, protocol, tuple, AttributeType};

/// Source and destination address of one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpTuple {
    pub source_address: Option<IpAddr>,
    pub destination_address: Option<IpAddr>,
}

impl IpTuple {
    fn decode(attr: &Attribute) -> Result<Self> {
        let mut ipt = Self::default();

        for child in nested_children(attr, "ip tuple")? {
            match child.kind {
                ip::V4_SRC => ipt.source_address = Some(v4_address(child)?),
                ip::V4_DST => ipt.destination_address = Some(v4_address(child)?),
                ip::V6_SRC => ipt.source_address = Some(v6_address(child)?),
                ip::V6_DST => ipt.destination_address = Some(v6_address(child)?),
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "ip tuple",
                        kind,
                    })
                }
            }
        }

        if ipt.source_address.is_none() || ipt.destination_address.is_none() {
            return Err(ConntrackError::malformed(
                "ip tuple",
                "needs both a source and a destination address",
            ));
        }

        Ok(ipt)
    }

    fn encode(&self) -> Result<Attribute> {
        let children = match (self.source_address, self.destination_address) {
            (Some(IpAddr::V4(src)), Some(IpAddr::V4(dst))) => vec![
                Attribute::new(ip::V4_SRC, src.octets().to_vec()),
                Attribute::new(ip::V4_DST, dst.octets().to_vec()),
            ],
            (Some(IpAddr::V6(src)), Some(IpAddr::V6(dst))) => vec![
                Attribute::new(ip::V6_SRC, src.octets().to_vec()),
                Attribute::new(ip::V6_DST, dst.octets().to_vec()),
            ],
            (Some(src), Some(dst)) => {
                return Err(ConntrackError::InvalidAddressFamily { src, dst });
            }
            _ => {
                return Err(ConntrackError::malformed(
                    "ip tuple",
                    "source and destination addresses are required",
                ));
            }
        };
        Ok(Attribute::nested(tuple::IP, children))
    }
}

fn v4_address(attr: &Attribute) -> Result<IpAddr> {
    let octets: [u8; 4] = attr.bytes().try_into().map_err(|_| {
        ConntrackError::malformed(
            "ip tuple",
            format!("IPv4 address has {} bytes", attr.data.len()),
        )
    })?;
    Ok(IpAddr::V4(Ipv4Addr::from(octets)))
}

fn v6_address(attr: &Attribute) -> Result<IpAddr> {
    let octets: [u8; 16] = attr.bytes().try_into().map_err(|_| {
        ConntrackError::malformed(
            "ip tuple",
            format!("IPv6 address has {} bytes", attr.data.len()),
        )
    })?;
    Ok(IpAddr::V6(Ipv6Addr::from(octets)))
}

/// Layer 4 part of a tuple.
///
/// Ports apply to port-based protocols, the ICMP fields to ICMP and ICMPv6.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtoTuple {
    pub protocol: u8,
    pub source_port: u16,
    pub destination_port: u16,
    pub icmp_id: u16,
    pub icmp_type: u8,
    pub icmp_code: u8,
}

impl ProtoTuple {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "proto tuple")?;
        if children.is_empty() {
            return Err(ConntrackError::malformed("proto tuple", "no children"));
        }

        let mut pt = Self::default();
        for child in children {
            match child.kind {
                proto::NUM => pt.protocol = child.uint8()?,
                proto::SRC_PORT => pt.source_port = child.uint16()?,
                proto::DST_PORT => pt.destination_port = child.uint16()?,
                proto::ICMP_ID | proto::ICMPV6_ID => pt.icmp_id = child.uint16()?,
                proto::ICMP_TYPE | proto::ICMPV6_TYPE => pt.icmp_type = child.uint8()?,
                proto::ICMP_CODE | proto::ICMPV6_CODE => pt.icmp_code = child.uint8()?,
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "proto tuple",
                        kind,
                    })
                }
            }
        }

        Ok(pt)
    }

    fn encode(&self) -> Attribute {
        let mut children = vec![Attribute::u8(proto::NUM, self.protocol)];

        match self.protocol {
            protocol::ICMP => children.extend([
                Attribute::u16(proto::ICMP_ID, self.icmp_id),
                Attribute::u8(proto::ICMP_TYPE, self.icmp_type),
                Attribute::u8(proto::ICMP_CODE, self.icmp_code),
            ]),
            protocol::ICMPV6 => children.extend([
                Attribute::u16(proto::ICMPV6_ID, self.icmp_id),
                Attribute::u8(proto::ICMPV6_TYPE, self.icmp_type),
                Attribute::u8(proto::ICMPV6_CODE, self.icmp_code),
            ]),
            _ => children.extend([
                Attribute::u16(proto::SRC_PORT, self.source_port),
                Attribute::u16(proto::DST_PORT, self.destination_port),
            ]),
        }

        Attribute::nested(tuple::PROTO, children)
    }
}

/// One directional identity of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple {
    pub ip: IpTuple,
    pub proto: ProtoTuple,
    /// Zone of this direction (CTA_TUPLE_ZONE), 0 when unset.
    pub zone: u16,
}

impl Tuple {
    /// Create a tuple for a port-based protocol.
    pub fn new(
        protocol: u8,
        source: IpAddr,
        destination: IpAddr,
        source_port: u16,
        destination_port: u16,
    ) -> Self {
        Self {
            ip: IpTuple {
                source_address: Some(source),
                destination_address: Some(destination),
            },
            proto: ProtoTuple {
                protocol,
                source_port,
                destination_port,
                ..Default::default()
            },
            zone: 0,
        }
    }

    /// The same tuple seen from the other end: addresses and ports swapped.
    pub fn reversed(&self) -> Self {
        Self {
            ip: IpTuple {
                source_address: self.ip.destination_address,
                destination_address: self.ip.source_address,
            },
            proto: ProtoTuple {
                source_port: self.proto.destination_port,
                destination_port: self.proto.source_port,
                ..self.proto
            },
            zone: self.zone,
        }
    }
}

impl AttributeCodec for Tuple {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "tuple")?;
        if children.len() < 2 {
            return Err(ConntrackError::malformed(
                "tuple",
                format!("expected ip and proto children, got {}", children.len()),
            ));
        }

        let mut t = Self::default();
        let (mut has_ip, mut has_proto) = (false, false);

        for child in children {
            match child.kind {
                tuple::IP => {
                    t.ip = IpTuple::decode(child)?;
                    has_ip = true;
                }
                tuple::PROTO => {
                    t.proto = ProtoTuple::decode(child)?;
                    has_proto = true;
                }
                tuple::ZONE => t.zone = child.uint16()?,
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "tuple",
                        kind,
                    })
                }
            }
        }

        if !has_ip || !has_proto {
            return Err(ConntrackError::malformed(
                "tuple",
                "missing ip or proto group",
            ));
        }

        Ok(t)
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        let mut children = Vec::with_capacity(3);
        children.push(self.ip.encode()?);
        children.push(self.proto.encode());
        if self.zone != 0 {
            children.push(Attribute::u16(tuple::ZONE, self.zone));
        }
        Ok(Attribute::nested(kind.code(), children))
    }

    fn filled(&self) -> bool {
        self.ip.source_address.is_some()
            && self.ip.destination_address.is_some()
            && self.proto.protocol != 0
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn addr(a: Option<IpAddr>) -> String {
            a.map_or_else(|| "?".to_string(), |a| a.to_string())
        }
        write!(
            f,
            "proto {}, {}:{} -> {}:{}",
            self.proto.protocol,
            addr(self.ip.source_address),
            self.proto.source_port,
            addr(self.ip.destination_address),
            self.proto.destination_port
        )?;
        if self.zone != 0 {
            write!(f, ", zone {}", self.zone)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netfilter::{decode_attributes, encode_attributes};
    use bytes::Bytes;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    /// Encode then decode through real wire bytes.
    fn through_wire(attr: Attribute) -> Attribute {
        let bytes = encode_attributes(&[attr]).unwrap();
        decode_attributes(&Bytes::from(bytes)).unwrap().remove(0)
    }

    #[test]
    fn test_tuple_v4_wire_roundtrip() {
        let t = Tuple::new(protocol::TCP, v4(10, 0, 0, 1), v4(10, 0, 0, 2), 1234, 80);
        let attr = through_wire(t.encode(AttributeType::TupleOrig).unwrap());

        assert_eq!(attr.kind, AttributeType::TupleOrig.code());
        assert!(attr.nested);
        assert_eq!(Tuple::decode(&attr).unwrap(), t);
    }

    #[test]
    fn test_tuple_v6_uses_v6_attributes() {
        let src: IpAddr = "2001:db8::1".parse().unwrap();
        let dst: IpAddr = "2001:db8::2".parse().unwrap();
        let t = Tuple::new(protocol::UDP, src, dst, 5353, 53);
        let attr = t.encode(AttributeType::TupleReply).unwrap();

        let ip_group = &attr.children[0];
        assert_eq!(ip_group.children[0].kind, ip::V6_SRC);
        assert_eq!(ip_group.children[0].bytes().len(), 16);
        assert_eq!(Tuple::decode(&through_wire(attr)).unwrap(), t);
    }

    #[test]
    fn test_tuple_mixed_families_rejected() {
        let t = Tuple::new(protocol::TCP, v4(10, 0, 0, 1), "::1".parse().unwrap(), 1, 2);
        let err = t.encode(AttributeType::TupleOrig).unwrap_err();
        assert!(matches!(err, ConntrackError::InvalidAddressFamily { .. }));
    }

    #[test]
    fn test_tuple_zone_encoded_when_set() {
        let mut t = Tuple::new(protocol::TCP, v4(1, 1, 1, 1), v4(2, 2, 2, 2), 1, 2);
        assert_eq!(t.encode(AttributeType::TupleOrig).unwrap().children.len(), 2);

        t.zone = 7;
        let attr = t.encode(AttributeType::TupleOrig).unwrap();
        assert_eq!(attr.children.len(), 3);
        assert_eq!(Tuple::decode(&attr).unwrap().zone, 7);
    }

    #[test]
    fn test_icmp_tuple_encodes_icmp_fields() {
        let mut t = Tuple::new(protocol::ICMP, v4(10, 0, 0, 1), v4(10, 0, 0, 2), 0, 0);
        t.proto.icmp_id = 0x1234;
        t.proto.icmp_type = 8;

        let attr = t.encode(AttributeType::TupleOrig).unwrap();
        let kinds: Vec<u16> = attr.children[1].children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![proto::NUM, proto::ICMP_ID, proto::ICMP_TYPE, proto::ICMP_CODE]);
        assert_eq!(Tuple::decode(&attr).unwrap(), t);
    }

    #[test]
    fn test_icmpv6_tuple_encodes_icmpv6_fields() {
        let mut t = Tuple::new(protocol::ICMPV6, "::1".parse().unwrap(), "::2".parse().unwrap(), 0, 0);
        t.proto.icmp_type = 128;

        let attr = t.encode(AttributeType::TupleOrig).unwrap();
        assert_eq!(attr.children[1].children[2].kind, proto::ICMPV6_TYPE);
        assert_eq!(Tuple::decode(&attr).unwrap(), t);
    }

    #[test]
    fn test_tuple_filled() {
        assert!(!Tuple::default().filled());

        let mut t = Tuple::new(protocol::TCP, v4(1, 1, 1, 1), v4(2, 2, 2, 2), 1, 2);
        assert!(t.filled());

        t.proto.protocol = 0;
        assert!(!t.filled());
    }

    #[test]
    fn test_reversed_swaps_direction() {
        let t = Tuple::new(protocol::TCP, v4(10, 0, 0, 1), v4(10, 0, 0, 2), 1234, 80);
        let r = t.reversed();

        assert_eq!(r.ip.source_address, Some(v4(10, 0, 0, 2)));
        assert_eq!(r.ip.destination_address, Some(v4(10, 0, 0, 1)));
        assert_eq!(r.proto.source_port, 80);
        assert_eq!(r.proto.destination_port, 1234);
        assert_eq!(r.proto.protocol, protocol::TCP);
        assert_eq!(r.reversed(), t);
    }

    #[test]
    fn test_decode_bad_address_length() {
        let attr = Attribute::nested(
            1,
            vec![
                Attribute::nested(
                    tuple::IP,
                    vec![
                        Attribute::new(ip::V4_SRC, vec![10, 0, 0]),
                        Attribute::new(ip::V4_DST, vec![10, 0, 0, 2]),
                    ],
                ),
                Attribute::nested(tuple::PROTO, vec![Attribute::u8(proto::NUM, 6)]),
            ],
        );
        let err = Tuple::decode(&attr).unwrap_err();
        assert!(err.to_string().contains("IPv4 address has 3 bytes"));
    }

    #[test]
    fn test_decode_unknown_child() {
        let attr = Attribute::nested(
            1,
            vec![
                Attribute::nested(tuple::PROTO, vec![Attribute::u8(proto::NUM, 6)]),
                Attribute::u8(9, 0),
            ],
        );
        assert_eq!(
            Tuple::decode(&attr).unwrap_err(),
            ConntrackError::UnknownChild {
                context: "tuple",
                kind: 9
            }
        );
    }

    #[test]
    fn test_decode_not_nested() {
        let attr = Attribute::u32(1, 0);
        assert!(matches!(
            Tuple::decode(&attr).unwrap_err(),
            ConntrackError::Malformed { context: "tuple", .. }
        ));
    }

    #[test]
    fn test_decode_missing_proto_group() {
        let ip_group = Attribute::nested(
            tuple::IP,
            vec![
                Attribute::new(ip::V4_SRC, vec![10, 0, 0, 1]),
                Attribute::new(ip::V4_DST, vec![10, 0, 0, 2]),
            ],
        );
        let attr = Attribute::nested(1, vec![ip_group, Attribute::u16(tuple::ZONE, 1)]);
        assert!(Tuple::decode(&attr).unwrap_err().to_string().contains("missing"));
    }

    #[test]
    fn test_display() {
        let t = Tuple::new(protocol::UDP, v4(10, 0, 0, 1), v4(10, 0, 0, 2), 5000, 53);
        assert_eq!(t.to_string(), "proto 17, 10.0.0.1:5000 -> 10.0.0.2:53");
    }
}
