//! Conntrack events received from a multicast subscription.
//!
//! ctnetlink reuses the NEW message type for both creation and update
//! events; only the CREATE/EXCL flags tell them apart.

use serde::{Deserialize, Serialize};

use crate::error::{ConntrackError, Result};
use crate::flow::Flow;
use crate::netfilter::{flags, unmarshal_netlink, Header, Message};
use crate::types::{message_type, NFNL_SUBSYS_CTNETLINK};

/// Kind of change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A new connection entered the table.
    New,
    /// An existing connection changed.
    Update,
    /// A connection left the table.
    Destroy,
}

impl EventType {
    /// Derive the event kind from a netfilter header.
    pub fn from_header(header: &Header) -> Result<Self> {
        let unknown = || ConntrackError::UnknownEvent {
            subsystem: header.subsystem,
            message_type: header.message_type,
        };

        if header.subsystem != NFNL_SUBSYS_CTNETLINK {
            return Err(unknown());
        }

        match header.message_type {
            message_type::NEW if flags::has_flag(header.flags, flags::CREATE | flags::EXCL) => {
                Ok(Self::New)
            }
            message_type::NEW => Ok(Self::Update),
            message_type::DELETE => Ok(Self::Destroy),
            _ => Err(unknown()),
        }
    }
}

/// A decoded conntrack event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventType,
    pub flow: Flow,
}

impl Event {
    /// Decode an event from a raw netfilter message.
    pub fn decode(message: &Message) -> Result<Self> {
        let (header, attrs) = unmarshal_netlink(message)?;
        let kind = EventType::from_header(&header)?;

        match Flow::decode(&attrs) {
            Ok(flow) => Ok(Self { kind, flow }),
            Err(e) => {
                tracing::debug!(?kind, sequence = header.sequence, "dropping event: {}", e);
                Err(e)
            }
        }
    }
}
