//! Single-value attribute encoders.
//!
//! Flow decode reads scalars straight from the attribute, so these
//! wrappers only go one way.

use crate::netfilter::Attribute;
use crate::types::AttributeType;

/// A u16 written as a Big Endian attribute (zone).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Num16 {
    pub value: u16,
}

impl Num16 {
    #[inline]
    pub fn new(value: u16) -> Self {
        Self { value }
    }

    /// Encode as an attribute of the given type.
    pub fn encode(&self, kind: AttributeType) -> Attribute {
        Attribute::u16(kind.code(), self.value)
    }
}

/// A u32 written as a Big Endian attribute (timeout, mark).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Num32 {
    pub value: u32,
}

impl Num32 {
    #[inline]
    pub fn new(value: u32) -> Self {
        Self { value }
    }

    /// Encode as an attribute of the given type.
    pub fn encode(&self, kind: AttributeType) -> Attribute {
        Attribute::u32(kind.code(), self.value)
    }
}
