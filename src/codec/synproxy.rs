//! SYN proxy parameters (CTA_SYNPROXY).

use serde::{Deserialize, Serialize};

use super::{nested_children, AttributeCodec};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::{synproxy, AttributeType};

/// State negotiated by the SYN proxy on behalf of the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SynProxy {
    /// Initial sequence number.
    pub isn: u32,
    /// Initial TCP timestamp option value.
    pub its: u32,
    /// Timestamp offset applied to the backend side.
    pub tsoff: u32,
}

impl AttributeCodec for SynProxy {
    fn decode(attr: &Attribute) -> Result<Self> {
        let children = nested_children(attr, "synproxy")?;
        if children.is_empty() {
            return Err(ConntrackError::malformed("synproxy", "no children"));
        }

        let mut sp = Self::default();
        for child in children {
            match child.kind {
                synproxy::ISN => sp.isn = child.uint32()?,
                synproxy::ITS => sp.its = child.uint32()?,
                synproxy::TSOFF => sp.tsoff = child.uint32()?,
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "synproxy",
                        kind,
                    })
                }
            }
        }
        Ok(sp)
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        Ok(Attribute::nested(
            kind.code(),
            vec![
                Attribute::u32(synproxy::ISN, self.isn),
                Attribute::u32(synproxy::ITS, self.its),
                Attribute::u32(synproxy::TSOFF, self.tsoff),
            ],
        ))
    }

    fn filled(&self) -> bool {
        self.isn != 0 || self.its != 0 || self.tsoff != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synproxy_roundtrip() {
        let sp = SynProxy {
            isn: 0x1111,
            its: 0x2222,
            tsoff: 0x3333,
        };
        let attr = sp.encode(AttributeType::SynProxy).unwrap();
        assert_eq!(attr.kind, 24);
        assert_eq!(SynProxy::decode(&attr).unwrap(), sp);
    }

    #[test]
    fn test_synproxy_wrong_size() {
        let attr = Attribute::nested(24, vec![Attribute::u16(synproxy::ISN, 1)]);
        assert!(SynProxy::decode(&attr).is_err());
    }

    #[test]
    fn test_synproxy_filled() {
        assert!(!SynProxy::default().filled());
        assert!(SynProxy {
            tsoff: 1,
            ..Default::default()
        }
        .filled());
    }
}
