//! Per-direction packet and byte counters (CTA_COUNTERS_ORIG / REPLY).

use serde::{Deserialize, Serialize};

use super::{nested_children, AttributeCodec};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::{counters, AttributeType};

/// Packet and byte counts of one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counter {
    pub packets: u64,
    pub bytes: u64,
}

impl AttributeCodec for Counter {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "counters")?;
        if children.is_empty() {
            return Err(ConntrackError::malformed("counters", "no children"));
        }

        let mut ctr = Self::default();
        for child in children {
            match child.kind {
                counters::PACKETS => ctr.packets = child.uint64()?,
                counters::BYTES => ctr.bytes = child.uint64()?,
                // 32-bit variants sent by older kernels
                counters::PACKETS32 => ctr.packets = u64::from(child.uint32()?),
                counters::BYTES32 => ctr.bytes = u64::from(child.uint32()?),
                counters::PAD => {}
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "counters",
                        kind,
                    })
                }
            }
        }
        Ok(ctr)
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        Ok(Attribute::nested(
            kind.code(),
            vec![
                Attribute::u64(counters::PACKETS, self.packets),
                Attribute::u64(counters::BYTES, self.bytes),
            ],
        ))
    }

    fn filled(&self) -> bool {
        self.packets != 0 || self.bytes != 0
    }
}
