//! Error types for conntrack-codec.

use std::net::IpAddr;

use thiserror::Error;

/// Main error type for all codec operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConntrackError {
    /// Flow decode met a top-level attribute type outside the known set.
    #[error("unknown attribute type {0}")]
    UnknownAttribute(u16),

    /// Flow encode needs filled original and reply tuples.
    #[error("flow needs both an original and a reply tuple")]
    NeedTuples,

    /// A nested value could not be interpreted (wrong size, not nested, missing child).
    #[error("malformed {context} attribute: {reason}")]
    Malformed {
        /// Which attribute group was being decoded.
        context: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A nested group contained a child type its decoder does not know.
    #[error("unknown {context} child attribute type {kind}")]
    UnknownChild {
        /// Which attribute group was being decoded.
        context: &'static str,
        /// The unrecognized child type code.
        kind: u16,
    },

    /// Tuple encode was given source and destination addresses of different families.
    #[error("invalid address family: source {src} and destination {dst} differ")]
    InvalidAddressFamily {
        /// Source address of the tuple.
        src: IpAddr,
        /// Destination address of the tuple.
        dst: IpAddr,
    },

    /// ProtoInfo encode was called with no protocol variant populated.
    #[error("protoinfo has no protocol variant set")]
    EmptyProtoInfo,

    /// Message header does not describe a conntrack event.
    #[error("unknown event: subsystem {subsystem}, message type {message_type}")]
    UnknownEvent {
        /// Netfilter subsystem id from the message header.
        subsystem: u8,
        /// Subsystem message type from the message header.
        message_type: u8,
    },

    /// Netlink framing error (truncated buffer, bad length field).
    #[error("netlink error: {0}")]
    Netlink(String),
}

impl ConntrackError {
    pub(crate) fn malformed(context: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            context,
            reason: reason.into(),
        }
    }
}

/// Result type alias using ConntrackError.
pub type Result<T> = std::result::Result<T, ConntrackError>;
