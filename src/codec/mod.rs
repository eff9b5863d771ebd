//! Codec module - typed sub-entities of a conntrack Flow.
//!
//! Every composite value nested inside a Flow implements [`AttributeCodec`]:
//!
//! - [`Tuple`] - directional connection identity (addresses, protocol, ports)
//! - [`Status`] - 32-bit connection state flags
//! - [`ProtoInfo`] - TCP/DCCP/SCTP protocol state
//! - [`Helper`], [`Counter`], [`SecurityContext`], [`Timestamp`],
//!   [`SequenceAdjust`], [`SynProxy`]
//!
//! Plain integers are written with the [`Num16`]/[`Num32`] wrappers.
//!
//! # Design
//!
//! The outer attribute type is always supplied by the caller: the same
//! `Tuple` encodes as CTA_TUPLE_ORIG, CTA_TUPLE_REPLY or CTA_TUPLE_MASTER,
//! and the same `Counter` as either direction.
//!
//! # Example
//!
//! ```
//! use conntrack_codec::codec::{AttributeCodec, Counter};
//! use conntrack_codec::types::AttributeType;
//!
//! let counter = Counter { packets: 3, bytes: 180 };
//! let attr = counter.encode(AttributeType::CountersOrig).unwrap();
//! assert_eq!(Counter::decode(&attr).unwrap(), counter);
//! ```

mod counter;
mod helper;
mod proto_info;
mod scalar;
mod security;
mod seq_adjust;
pub mod status;
mod synproxy;
mod timestamp;
mod tuple;

pub use counter::Counter;
pub use helper::Helper;
pub use proto_info::{ProtoInfo, ProtoInfoDccp, ProtoInfoSctp, ProtoInfoTcp};
pub use scalar::{Num16, Num32};
pub use security::SecurityContext;
pub use seq_adjust::SequenceAdjust;
pub use status::Status;
pub use synproxy::SynProxy;
pub use timestamp::Timestamp;
pub use tuple::{IpTuple, ProtoTuple, Tuple};

use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::AttributeType;

/// Shared contract of every Flow sub-entity.
pub trait AttributeCodec: Sized {
    /// Decode the entity from its top-level attribute.
    fn decode(attr: &Attribute) -> Result<Self>;

    /// Encode the entity as a top-level attribute of the given type.
    fn encode(&self, kind: AttributeType) -> Result<Attribute>;

    /// Whether the entity holds enough data to be sent to the kernel.
    fn filled(&self) -> bool;
}

/// Children of a nested attribute, or an error naming the group.
pub(crate) fn nested_children<'a>(
    attr: &'a Attribute,
    context: &'static str,
) -> Result<&'a [Attribute]> {
    if !attr.nested {
        return Err(ConntrackError::malformed(
            context,
            format!("type {} is not nested", attr.kind),
        ));
    }
    Ok(&attr.children)
}
