//! Request builder for create/update/delete/get messages.
//!
//! # Example
//!
//! ```
//! use std::net::{IpAddr, Ipv6Addr};
//! use conntrack_codec::{Flow, RequestBuilder};
//! use conntrack_codec::types::family;
//!
//! let flow = Flow::new(
//!     6,
//!     0,
//!     IpAddr::V6(Ipv6Addr::LOCALHOST),
//!     IpAddr::V6(Ipv6Addr::LOCALHOST),
//!     40000,
//!     8080,
//!     300,
//!     0,
//! );
//!
//! let message = RequestBuilder::create().sequence(7).build(&flow).unwrap();
//! assert_eq!(message.header.sequence, 7);
//! assert_eq!(message.payload[0], family::INET6);
//! ```

use std::net::IpAddr;

use crate::error::Result;
use crate::flow::Flow;
use crate::netfilter::{flags, marshal_netlink, Header, Message, NFNETLINK_V0};
use crate::types::{family, message_type, NFNL_SUBSYS_CTNETLINK};

/// Flags set on every request.
pub const DEFAULT_REQUEST_FLAGS: u16 = flags::REQUEST | flags::ACK;

/// Builder for a conntrack request message carrying one Flow.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    message_type: u8,
    flags: u16,
    family: Option<u8>,
    sequence: u32,
    pid: u32,
}

impl RequestBuilder {
    fn with_type(message_type: u8, flags: u16) -> Self {
        Self {
            message_type,
            flags: DEFAULT_REQUEST_FLAGS | flags,
            family: None,
            sequence: 0,
            pid: 0,
        }
    }

    /// Create a new entry; fails in the kernel if it already exists.
    pub fn create() -> Self {
        Self::with_type(message_type::NEW, flags::CREATE | flags::EXCL)
    }

    /// Update an existing entry.
    pub fn update() -> Self {
        Self::with_type(message_type::NEW, 0)
    }

    /// Delete the entry matching the Flow's tuples.
    pub fn delete() -> Self {
        Self::with_type(message_type::DELETE, 0)
    }

    /// Query the entry matching the Flow's tuples.
    pub fn get() -> Self {
        Self::with_type(message_type::GET, 0)
    }

    /// Set the protocol family instead of inferring it from the original tuple.
    pub fn family(mut self, family: u8) -> Self {
        self.family = Some(family);
        self
    }

    /// Add netlink flags on top of the request defaults.
    pub fn flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the sequence number.
    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Set the sending port id (0 lets the kernel fill it in).
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Encode the Flow and wrap it into a message.
    pub fn build(&self, flow: &Flow) -> Result<Message> {
        let attrs = flow.encode()?;
        let family = self.family.unwrap_or_else(|| infer_family(flow));

        let header = Header {
            subsystem: NFNL_SUBSYS_CTNETLINK,
            message_type: self.message_type,
            flags: self.flags,
            sequence: self.sequence,
            pid: self.pid,
            family,
            version: NFNETLINK_V0,
            resource_id: 0,
        };

        let message = marshal_netlink(&header, &attrs)?;
        tracing::trace!(
            message_type = self.message_type,
            family,
            sequence = self.sequence,
            length = message.header.length,
            "built conntrack request"
        );
        Ok(message)
    }
}

fn infer_family(flow: &Flow) -> u8 {
    match flow.tuple_orig.ip.source_address {
        Some(IpAddr::V4(_)) => family::INET,
        Some(IpAddr::V6(_)) => family::INET6,
        None => family::UNSPEC,
    }
}
