//! SELinux security context (CTA_SECCTX).

use serde::{Deserialize, Serialize};

use super::{nested_children, AttributeCodec};
use crate::error::{ConntrackError, Result};
use crate::netfilter::Attribute;
use crate::types::{secctx, AttributeType};

/// Security context label of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityContext {
    pub name: String,
}

impl AttributeCodec for SecurityContext {
    fn decode(attr: &Attribute) -> Result<Self> {
        let mut ctx = Self::default();
        for child in nested_children(attr, "secctx")? {
            match child.kind {
                secctx::NAME => ctx.name = child.string_value()?,
                kind => {
                    return Err(ConntrackError::UnknownChild {
                        context: "secctx",
                        kind,
                    })
                }
            }
        }
        Ok(ctx)
    }

    fn encode(&self, kind: AttributeType) -> Result<Attribute> {
        Ok(Attribute::nested(
            kind.code(),
            vec![Attribute::string(secctx::NAME, &self.name)],
        ))
    }

    fn filled(&self) -> bool {
        !self.name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secctx_decode() {
        let attr = Attribute::nested(
            19,
            vec![Attribute::string(secctx::NAME, "system_u:object_r:unlabeled_t:s0")],
        );
        let ctx = SecurityContext::decode(&attr).unwrap();
        assert_eq!(ctx.name, "system_u:object_r:unlabeled_t:s0");
        assert!(ctx.filled());
    }

    #[test]
    fn test_secctx_invalid_utf8() {
        let attr = Attribute::nested(19, vec![Attribute::new(secctx::NAME, vec![0xFF, 0xFE])]);
        assert!(matches!(
            SecurityContext::decode(&attr).unwrap_err(),
            ConntrackError::Malformed { .. }
        ));
    }

    #[test]
    fn test_secctx_encode() {
        let ctx = SecurityContext {
            name: "ctx".to_string(),
        };
        let attr = ctx.encode(AttributeType::SecCtx).unwrap();
        assert_eq!(attr.kind, 19);
        assert_eq!(SecurityContext::decode(&attr).unwrap(), ctx);
    }
}
