//! Netlink message framing and the netfilter header.
//!
//! A netfilter message as read from a `NETLINK_NETFILTER` socket:
//! ```text
//! ┌───────────────────────────────┐
//! │ nlmsghdr (16 bytes, host BO)  │  length, type, flags, seq, pid
//! ├───────────────────────────────┤
//! │ nfgenmsg (4 bytes)            │  family, version, res_id (BE)
//! ├───────────────────────────────┤
//! │ attributes (4-byte aligned)   │
//! └───────────────────────────────┘
//! ```
//!
//! The netlink type of a netfilter message is `subsystem << 8 | message_type`.

use bytes::{BufMut, Bytes};

use super::attribute::{align, decode_attributes, encode_attributes, Attribute};
use crate::error::{ConntrackError, Result};

/// Netlink message header size in bytes.
pub const NETLINK_HEADER_SIZE: usize = 16;

/// Netfilter generic header (`nfgenmsg`) size in bytes.
pub const NETFILTER_HEADER_SIZE: usize = 4;

/// Netfilter protocol version carried in `nfgenmsg`.
pub const NFNETLINK_V0: u8 = 0;

/// Netlink message flags.
pub mod flags {
    /// Message is a request.
    pub const REQUEST: u16 = 0x001;
    /// Part of a multipart message.
    pub const MULTI: u16 = 0x002;
    /// Ask for an acknowledgment.
    pub const ACK: u16 = 0x004;
    /// Echo this request.
    pub const ECHO: u16 = 0x008;
    /// Return the complete table.
    pub const ROOT: u16 = 0x100;
    /// Return all matching entries.
    pub const MATCH: u16 = 0x200;
    /// Dump request: root + match.
    pub const DUMP: u16 = ROOT | MATCH;
    /// Replace an existing object.
    pub const REPLACE: u16 = 0x100;
    /// Do not touch an existing object.
    pub const EXCL: u16 = 0x200;
    /// Create the object if it does not exist.
    pub const CREATE: u16 = 0x400;
    /// Add to the end of the object list.
    pub const APPEND: u16 = 0x800;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u16, flag: u16) -> bool {
        flags & flag != 0
    }
}

/// Netlink message header (`nlmsghdr`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetlinkHeader {
    /// Total message length, header included.
    pub length: u32,
    /// Message type.
    pub kind: u16,
    /// Message flags (see [`flags`]).
    pub flags: u16,
    /// Sequence number.
    pub sequence: u32,
    /// Sending port id.
    pub pid: u32,
}

impl NetlinkHeader {
    /// Encode header to bytes (host byte order).
    pub fn encode(&self) -> [u8; NETLINK_HEADER_SIZE] {
        let mut buf = [0u8; NETLINK_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.length.to_ne_bytes());
        buf[4..6].copy_from_slice(&self.kind.to_ne_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.sequence.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.pid.to_ne_bytes());
        buf
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < NETLINK_HEADER_SIZE {
            return None;
        }
        Some(Self {
            length: u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            kind: u16::from_ne_bytes([buf[4], buf[5]]),
            flags: u16::from_ne_bytes([buf[6], buf[7]]),
            sequence: u32::from_ne_bytes([buf[8], buf[9], buf[10], buf[11]]),
            pid: u32::from_ne_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }
}

/// A single raw netlink message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Decoded netlink header.
    pub header: NetlinkHeader,
    /// Everything after the netlink header.
    pub payload: Bytes,
}

impl Message {
    /// Create a message, fixing up the header length to match the payload.
    pub fn new(mut header: NetlinkHeader, payload: Bytes) -> Self {
        header.length = (NETLINK_HEADER_SIZE + payload.len()) as u32;
        Self { header, payload }
    }

    /// Decode one message from the start of `buf`.
    ///
    /// Bytes beyond the header's length field are ignored.
    pub fn decode(buf: Bytes) -> Result<Self> {
        let header = NetlinkHeader::decode(&buf).ok_or_else(|| {
            ConntrackError::Netlink(format!(
                "message of {} bytes is shorter than the netlink header",
                buf.len()
            ))
        })?;

        let length = header.length as usize;
        if length < NETLINK_HEADER_SIZE || length > buf.len() {
            return Err(ConntrackError::Netlink(format!(
                "message length {} does not fit buffer of {} bytes",
                length,
                buf.len()
            )));
        }

        Ok(Self {
            header,
            payload: buf.slice(NETLINK_HEADER_SIZE..length),
        })
    }

    /// Encode the message to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(NETLINK_HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Split a receive buffer holding several aligned messages.
pub fn split_messages(mut buf: Bytes) -> Result<Vec<Message>> {
    let mut messages = Vec::new();

    while !buf.is_empty() {
        let message = Message::decode(buf.clone())?;
        let advance = align(message.header.length as usize).min(buf.len());
        messages.push(message);
        let _ = buf.split_to(advance);
    }

    Ok(messages)
}

/// Netfilter view of a message header: netlink fields plus `nfgenmsg`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Netfilter subsystem (high byte of the netlink type).
    pub subsystem: u8,
    /// Subsystem message type (low byte of the netlink type).
    pub message_type: u8,
    /// Netlink message flags.
    pub flags: u16,
    /// Sequence number.
    pub sequence: u32,
    /// Sending port id.
    pub pid: u32,
    /// Protocol family (AF_INET, AF_INET6, ...).
    pub family: u8,
    /// Netfilter protocol version.
    pub version: u8,
    /// Resource id (Big Endian on the wire).
    pub resource_id: u16,
}

impl Header {
    /// Combined netlink message type.
    #[inline]
    pub fn netlink_kind(&self) -> u16 {
        (u16::from(self.subsystem) << 8) | u16::from(self.message_type)
    }
}

/// Unwrap a netfilter message into its header and attribute list.
pub fn unmarshal_netlink(message: &Message) -> Result<(Header, Vec<Attribute>)> {
    let payload = &message.payload;
    if payload.len() < NETFILTER_HEADER_SIZE {
        return Err(ConntrackError::Netlink(format!(
            "payload of {} bytes is shorter than the netfilter header",
            payload.len()
        )));
    }

    let header = Header {
        subsystem: (message.header.kind >> 8) as u8,
        message_type: (message.header.kind & 0xFF) as u8,
        flags: message.header.flags,
        sequence: message.header.sequence,
        pid: message.header.pid,
        family: payload[0],
        version: payload[1],
        resource_id: u16::from_be_bytes([payload[2], payload[3]]),
    };

    let attrs = decode_attributes(&payload.slice(NETFILTER_HEADER_SIZE..))?;
    Ok((header, attrs))
}

/// Wrap a header and attribute list into a netfilter message.
///
/// # Errors
///
/// Fails if an attribute is too long for its length field.
pub fn marshal_netlink(header: &Header, attrs: &[Attribute]) -> Result<Message> {
    let body = encode_attributes(attrs)?;
    let mut payload = Vec::with_capacity(NETFILTER_HEADER_SIZE + body.len());
    payload.put_u8(header.family);
    payload.put_u8(header.version);
    payload.put_u16(header.resource_id);
    payload.extend_from_slice(&body);

    let netlink = NetlinkHeader {
        length: 0,
        kind: header.netlink_kind(),
        flags: header.flags,
        sequence: header.sequence,
        pid: header.pid,
    };
    Ok(Message::new(netlink, Bytes::from(payload)))
}
