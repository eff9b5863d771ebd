//! Connection start/stop time (CTA_TIMESTAMP).
//!
//! Sent by the kernel with dumps and destroy events when
//! `nf_conntrack_timestamp` is enabled.

use serde::{Deserialize, Serialize};

use super::{nested_children, AttributeCodec};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::{timestamp, AttributeType};

/// Nanoseconds since the epoch. `stop` stays 0 while the flow is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub start: u64,
    pub stop: u64,
}

impl Timestamp {
    /// Whether the flow has ended.
    #[inline]
    pub fn closed(&self) -> bool {
        self.stop != 0
    }

    /// Lifetime in nanoseconds, if the flow has ended.
    pub fn duration_ns(&self) -> Option<u64> {
        self.closed().then(|| self.stop.saturating_sub(self.start))
    }
}

impl AttributeCodec for Timestamp {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "timestamp")?;
        if children.is_empty() {
            return Err(ConntrackError::malformed("timestamp", "no children"));
        }

        let mut ts = Self::default();
        for child in children {
            match child.kind {
                timestamp::START => ts.start = child.uint64()?,
                timestamp::STOP => ts.stop = child.uint64()?,
                timestamp::PAD => {}
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "timestamp",
                        kind,
                    })
                }
            }
        }
        Ok(ts)
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        let mut children = vec![Attribute::u64(timestamp::START, self.start)];
        if self.stop != 0 {
            children.push(Attribute::u64(timestamp::STOP, self.stop));
        }
        Ok(Attribute::nested(kind.code(), children))
    }

    fn filled(&self) -> bool {
        self.start != 0
    }
}
