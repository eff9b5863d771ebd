//! Netfilter module - netlink attribute and message primitives.
//!
//! This module implements the wire layer the conntrack codec sits on:
//! - TLV attribute encoding/decoding with recursive nested groups
//! - Netlink message header and multipart buffer splitting
//! - `nfgenmsg` header wrap/unwrap for netfilter messages
//!
//! It never opens a socket; buffers come from (and go to) the caller's transport.

mod attribute;
mod message;

pub use attribute::{
    align, decode_attributes, encode_attributes, Attribute, ATTRIBUTE_HEADER_SIZE,
    MAX_NESTING_DEPTH, NLA_F_NESTED, NLA_F_NET_BYTEORDER, NLA_TYPE_MASK,
};
pub use message::{
    flags, marshal_netlink, split_messages, unmarshal_netlink, Header, Message, NetlinkHeader,
    NETFILTER_HEADER_SIZE, NETLINK_HEADER_SIZE, NFNETLINK_V0,
};
