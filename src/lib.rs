//! # conntrack-codec
//!
//! Codec between Linux conntrack netlink messages and typed [`Flow`] records.
//!
//! This crate converts the nested attribute lists exchanged with the
//! kernel's ctnetlink subsystem into Flows and back. It never opens a
//! socket: raw message buffers come from (and go to) the caller's transport.
//!
//! ## Layers
//!
//! - **Netfilter** ([`netfilter`]): netlink attributes and message framing
//! - **Codec** ([`codec`]): tuples, status, protoinfo, counters and the other Flow parts
//! - **Flow** ([`Flow`]): attribute dispatch on decode, optionality policy on encode
//! - **Batch / Event / Request**: dump results, event streams, outgoing requests
//!
//! ## Example
//!
//! ```
//! use std::net::{IpAddr, Ipv4Addr};
//! use bytes::Bytes;
//! use conntrack_codec::codec::status::flags;
//! use conntrack_codec::netfilter::split_messages;
//! use conntrack_codec::{decode_flows, Flow, RequestBuilder};
//!
//! let flow = Flow::new(
//!     6,
//!     flags::ASSURED | flags::CONFIRMED,
//!     IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
//!     IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
//!     1234,
//!     80,
//!     120,
//!     7,
//! );
//!
//! // Bytes ready for a NETLINK_NETFILTER socket
//! let wire = RequestBuilder::create().sequence(1).build(&flow).unwrap().encode();
//!
//! // ... and back
//! let messages = split_messages(Bytes::from(wire)).unwrap();
//! let flows = decode_flows(&messages).unwrap();
//! assert_eq!(flows[0].tuple_reply.proto.destination_port, 1234);
//! assert!(flows[0].status.assured());
//! ```

pub mod codec;
pub mod error;
pub mod netfilter;
pub mod types;

mod batch;
mod event;
mod flow;
mod request;

pub use batch::{decode_flow, decode_flows};
pub use error::{ConntrackError, Result};
pub use event::{Event, EventType};
pub use flow::Flow;
pub use request::{RequestBuilder, DEFAULT_REQUEST_FLAGS};
