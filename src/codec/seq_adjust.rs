//! TCP sequence number correction (CTA_SEQ_ADJ_ORIG / REPLY).

use serde::{Deserialize, Serialize};

use super::{nested_children, AttributeCodec};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::{seqadj, AttributeType};

/// Sequence adjustment of one direction.
///
/// Packets before `correction_position` are shifted by `offset_before`,
/// later ones by `offset_after`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceAdjust {
    pub correction_position: u32,
    pub offset_before: i32,
    pub offset_after: i32,
}

impl AttributeCodec for SequenceAdjust {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "seqadj")?;
        if children.is_empty() {
            return Err(ConntrackError::malformed("seqadj", "no children"));
        }

        let mut adj = Self::default();
        for child in children {
            match child.kind {
                seqadj::CORRECTION_POS => adj.correction_position = child.uint32()?,
                seqadj::OFFSET_BEFORE => adj.offset_before = child.int32()?,
                seqadj::OFFSET_AFTER => adj.offset_after = child.int32()?,
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "seqadj",
                        kind,
                    })
                }
            }
        }
        Ok(adj)
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        Ok(Attribute::nested(
            kind.code(),
            vec![
                Attribute::u32(seqadj::CORRECTION_POS, self.correction_position),
                Attribute::i32(seqadj::OFFSET_BEFORE, self.offset_before),
                Attribute::i32(seqadj::OFFSET_AFTER, self.offset_after),
            ],
        ))
    }

    fn filled(&self) -> bool {
        self.correction_position != 0 || self.offset_before != 0 || self.offset_after != 0
    }
}
