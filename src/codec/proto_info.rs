//! Protocol-specific connection state (CTA_PROTOINFO).
//!
//! The kernel only sends this group for TCP, DCCP and SCTP flows. The
//! group holds exactly one child whose type selects the protocol.

use serde::{Deserialize, Serialize};

use super::{nested_children, AttributeCodec};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::{protoinfo, protoinfo_dccp, protoinfo_sctp, protoinfo_tcp, AttributeType};

/// Protocol state of a flow; at most one protocol is populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtoInfo {
    #[default]
    None,
    Tcp(ProtoInfoTcp),
    Dccp(ProtoInfoDccp),
    Sctp(ProtoInfoSctp),
}

impl AttributeCodec for ProtoInfo {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "protoinfo")?;
        let [child] = children else {
            return Err(ConntrackError::malformed(
                "protoinfo",
                format!("expected exactly one child, got {}", children.len()),
            ));
        };

        match child.kind {
            protoinfo::TCP => Ok(Self::Tcp(ProtoInfoTcp::decode(child)?)),
            protoinfo::DCCP => Ok(Self::Dccp(ProtoInfoDccp::decode(child)?)),
            protoinfo::SCTP => Ok(Self::Sctp(ProtoInfoSctp::decode(child)?)),
            kind => Err(ConntrackError::UnknownChild {
                context: "protoinfo",
                kind,
            }),
        }
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        let child = match self {
            Self::None => return Err(ConntrackError::EmptyProtoInfo),
            Self::Tcp(tcp) => tcp.encode(),
            Self::Dccp(dccp) => dccp.encode(),
            Self::Sctp(sctp) => sctp.encode(),
        };
        Ok(Attribute::nested(kind.code(), vec![child]))
    }

    fn filled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// TCP window scaling and flag state.
///
/// Flags are the kernel's `nf_ct_tcp_flags`: flag byte first, mask byte second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoInfoTcp {
    pub state: u8,
    pub original_window_scale: u8,
    pub reply_window_scale: u8,
    pub original_flags: u16,
    pub reply_flags: u16,
}

impl ProtoInfoTcp {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "protoinfo tcp")?;
        if children.is_empty() {
            return Err(ConntrackError::malformed("protoinfo tcp", "no children"));
        }

        let mut tcp = Self::default();
        let mut has_state = false;
        for child in children {
            match child.kind {
                protoinfo_tcp::STATE => {
                    tcp.state = child.uint8()?;
                    has_state = true;
                }
                protoinfo_tcp::WSCALE_ORIGINAL => tcp.original_window_scale = child.uint8()?,
                protoinfo_tcp::WSCALE_REPLY => tcp.reply_window_scale = child.uint8()?,
                protoinfo_tcp::FLAGS_ORIGINAL => tcp.original_flags = child.uint16()?,
                protoinfo_tcp::FLAGS_REPLY => tcp.reply_flags = child.uint16()?,
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "protoinfo tcp",
                        kind,
                    })
                }
            }
        }

        if !has_state {
            return Err(ConntrackError::malformed("protoinfo tcp", "missing state"));
        }
        Ok(tcp)
    }

    fn encode(&self) -> Attribute {
        Attribute::nested(
            protoinfo::TCP,
            vec![
                Attribute::u8(protoinfo_tcp::STATE, self.state),
                Attribute::u8(protoinfo_tcp::WSCALE_ORIGINAL, self.original_window_scale),
                Attribute::u8(protoinfo_tcp::WSCALE_REPLY, self.reply_window_scale),
                Attribute::u16(protoinfo_tcp::FLAGS_ORIGINAL, self.original_flags),
                Attribute::u16(protoinfo_tcp::FLAGS_REPLY, self.reply_flags),
            ],
        )
    }
}

/// DCCP state, role and handshake sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoInfoDccp {
    pub state: u8,
    pub role: u8,
    pub handshake_seq: u64,
}

impl ProtoInfoDccp {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "protoinfo dccp")?;
        if children.is_empty() {
            return Err(ConntrackError::malformed("protoinfo dccp", "no children"));
        }

        let mut dccp = Self::default();
        for child in children {
            match child.kind {
                protoinfo_dccp::STATE => dccp.state = child.uint8()?,
                protoinfo_dccp::ROLE => dccp.role = child.uint8()?,
                protoinfo_dccp::HANDSHAKE_SEQ => dccp.handshake_seq = child.uint64()?,
                protoinfo_dccp::PAD => {}
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "protoinfo dccp",
                        kind,
                    })
                }
            }
        }
        Ok(dccp)
    }

    fn encode(&self) -> Attribute {
        Attribute::nested(
            protoinfo::DCCP,
            vec![
                Attribute::u8(protoinfo_dccp::STATE, self.state),
                Attribute::u8(protoinfo_dccp::ROLE, self.role),
                Attribute::u64(protoinfo_dccp::HANDSHAKE_SEQ, self.handshake_seq),
            ],
        )
    }
}

/// SCTP state and verification tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoInfoSctp {
    pub state: u8,
    pub vtag_original: u32,
    pub vtag_reply: u32,
}

impl ProtoInfoSctp {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "protoinfo sctp")?;
        if children.is_empty() {
            return Err(ConntrackError::malformed("protoinfo sctp", "no children"));
        }

        let mut sctp = Self::default();
        for child in children {
            match child.kind {
                protoinfo_sctp::STATE => sctp.state = child.uint8()?,
                protoinfo_sctp::VTAG_ORIGINAL => sctp.vtag_original = child.uint32()?,
                protoinfo_sctp::VTAG_REPLY => sctp.vtag_reply = child.uint32()?,
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "protoinfo sctp",
                        kind,
                    })
                }
            }
        }
        Ok(sctp)
    }

    fn encode(&self) -> Attribute {
        Attribute::nested(
            protoinfo::SCTP,
            vec![
                Attribute::u8(protoinfo_sctp::STATE, self.state),
                Attribute::u32(protoinfo_sctp::VTAG_ORIGINAL, self.vtag_original),
                Attribute::u32(protoinfo_sctp::VTAG_REPLY, self.vtag_reply),
            ],
        )
    }
}
