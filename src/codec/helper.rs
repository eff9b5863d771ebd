//! Connection tracking helper (CTA_HELP).

use serde::{Deserialize, Serialize};

use super::{nested_children, AttributeCodec};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::{help, AttributeType};

/// Name of the attached helper module plus its private data.
///
/// `info` is helper-specific and never interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Helper {
    pub name: String,
    pub info: Vec<u8>,
}

impl AttributeCodec for Helper {
    fn decode(attr: &Attribute) -> Result<Self> {
        let mut helper = Self::default();
        for child in nested_children(attr, "helper")? {
            match child.kind {
                help::NAME => helper.name = child.string_value()?,
                help::INFO => helper.info = child.bytes().to_vec(),
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "helper",
                        kind,
                    })
                }
            }
        }
        Ok(helper)
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        let mut children = vec![Attribute::string(help::NAME, &self.name)];
        if !self.info.is_empty() {
            children.push(Attribute::new(help::INFO, self.info.clone()));
        }
        Ok(Attribute::nested(kind.code(), children))
    }

    fn filled(&self) -> bool {
        !self.name.is_empty()
    }
}
