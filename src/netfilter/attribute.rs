//! Netlink attribute (TLV) encoding and decoding.
//!
//! Every attribute starts with a 4-byte header:
//! ```text
//! ┌──────────┬──────────────────────────┬─────────────────┐
//! │ Length   │ N │ B │ Type (14 bits)    │ Value + padding │
//! │ u16 host │ 1 │ 1 │ u16 host          │ 4-byte aligned  │
//! └──────────┴──────────────────────────┴─────────────────┘
//! ```
//!
//! `N` marks a nested attribute whose value is itself a list of attributes,
//! `B` marks a value in network byte order. Header fields use host byte
//! order; conntrack scalar values are always Big Endian.

use bytes::{BufMut, Bytes};

use crate::error::{ConntrackError, Result};

/// Attribute header size in bytes.
pub const ATTRIBUTE_HEADER_SIZE: usize = 4;

/// Nested flag on the attribute type field.
pub const NLA_F_NESTED: u16 = 0x8000;

/// Network byte order flag on the attribute type field.
pub const NLA_F_NET_BYTEORDER: u16 = 0x4000;

/// Mask selecting the attribute type without its flags.
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// Deepest attribute nesting accepted on decode. ctnetlink itself uses four levels.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Round a length up to the 4-byte netlink alignment.
#[inline]
pub fn align(len: usize) -> usize {
    (len + 3) & !3
}

/// A single netlink attribute, possibly holding nested children.
///
/// For nested attributes `children` is authoritative when encoding;
/// `data` keeps the raw nested bytes of a decoded attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type with the flag bits stripped.
    pub kind: u16,
    /// Whether the value is a nested attribute list.
    pub nested: bool,
    /// Whether the sender flagged the value as network byte order.
    pub net_byte_order: bool,
    /// Raw value bytes (zero-copy slice of the source buffer when decoded).
    pub data: Bytes,
    /// Decoded children of a nested attribute.
    pub children: Vec<Attribute>,
}

impl Attribute {
    /// Create a leaf attribute holding raw bytes.
    pub fn new(kind: u16, data: impl Into<Bytes>) -> Self {
        Self {
            kind: kind & NLA_TYPE_MASK,
            nested: false,
            net_byte_order: false,
            data: data.into(),
            children: Vec::new(),
        }
    }

    /// Create a nested attribute from its children.
    pub fn nested(kind: u16, children: Vec<Attribute>) -> Self {
        Self {
            kind: kind & NLA_TYPE_MASK,
            nested: true,
            net_byte_order: false,
            data: Bytes::new(),
            children,
        }
    }

    /// Leaf attribute holding a single byte.
    pub fn u8(kind: u16, value: u8) -> Self {
        Self::new(kind, vec![value])
    }

    /// Leaf attribute holding a Big Endian u16.
    pub fn u16(kind: u16, value: u16) -> Self {
        Self::new(kind, value.to_be_bytes().to_vec())
    }

    /// Leaf attribute holding a Big Endian u32.
    pub fn u32(kind: u16, value: u32) -> Self {
        Self::new(kind, value.to_be_bytes().to_vec())
    }

    /// Leaf attribute holding a Big Endian u64.
    pub fn u64(kind: u16, value: u64) -> Self {
        Self::new(kind, value.to_be_bytes().to_vec())
    }

    /// Leaf attribute holding a Big Endian i32.
    pub fn i32(kind: u16, value: i32) -> Self {
        Self::new(kind, value.to_be_bytes().to_vec())
    }

    /// Leaf attribute holding a NUL-terminated string.
    pub fn string(kind: u16, value: &str) -> Self {
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value.as_bytes());
        data.push(0);
        Self::new(kind, data)
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N]> {
        self.data.as_ref().try_into().map_err(|_| {
            ConntrackError::malformed(
                "scalar",
                format!(
                    "type {} holds {} bytes, expected {}",
                    self.kind,
                    self.data.len(),
                    N
                ),
            )
        })
    }

    /// Read the value as a single byte.
    pub fn uint8(&self) -> Result<u8> {
        Ok(self.fixed::<1>()?[0])
    }

    /// Read the value as a Big Endian u16.
    pub fn uint16(&self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.fixed()?))
    }

    /// Read the value as a Big Endian u32.
    pub fn uint32(&self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.fixed()?))
    }

    /// Read the value as a Big Endian u64.
    pub fn uint64(&self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.fixed()?))
    }

    /// Read the value as a Big Endian i32.
    pub fn int32(&self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.fixed()?))
    }

    /// Read the value as a string, dropping trailing NUL bytes.
    pub fn string_value(&self) -> Result<String> {
        let raw = self.data.as_ref();
        let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        String::from_utf8(raw[..end].to_vec()).map_err(|e| {
            ConntrackError::malformed("string", format!("type {}: {}", self.kind, e))
        })
    }

    /// Get a reference to the raw value bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Type field as written on the wire, flags included.
    #[inline]
    pub fn wire_kind(&self) -> u16 {
        let mut kind = self.kind & NLA_TYPE_MASK;
        if self.nested {
            kind |= NLA_F_NESTED;
        }
        if self.net_byte_order {
            kind |= NLA_F_NET_BYTEORDER;
        }
        kind
    }

    /// Unpadded encoded length (header + value).
    pub fn encoded_len(&self) -> usize {
        let value_len = if self.nested {
            self.children.iter().map(|c| align(c.encoded_len())).sum()
        } else {
            self.data.len()
        };
        ATTRIBUTE_HEADER_SIZE + value_len
    }

    /// Encode the attribute, including trailing padding, onto `buf`.
    ///
    /// # Errors
    ///
    /// Fails if the attribute does not fit the u16 length field. Nothing is
    /// written in that case.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<()> {
        let encoded_len = self.encoded_len();
        let len = u16::try_from(encoded_len).map_err(|_| {
            ConntrackError::Netlink(format!(
                "attribute type {} is {} bytes long, limit is {}",
                self.kind,
                encoded_len,
                u16::MAX
            ))
        })?;
        self.write(buf, len);
        Ok(())
    }

    // Children are never longer than their parent; the length was checked at the top.
    fn write(&self, buf: &mut Vec<u8>, len: u16) {
        buf.put_u16_ne(len);
        buf.put_u16_ne(self.wire_kind());
        if self.nested {
            for child in &self.children {
                child.write(buf, child.encoded_len() as u16);
            }
        } else {
            buf.extend_from_slice(&self.data);
        }
        let len = len as usize;
        buf.put_bytes(0, align(len) - len);
    }
}

/// Decode a buffer into a list of attributes, recursing into nested ones.
///
/// Nesting deeper than [`MAX_NESTING_DEPTH`] levels is rejected.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use conntrack_codec::netfilter::{decode_attributes, encode_attributes, Attribute};
///
/// let attrs = vec![Attribute::u32(7, 120), Attribute::nested(1, vec![Attribute::u8(1, 6)])];
/// let decoded = decode_attributes(&Bytes::from(encode_attributes(&attrs).unwrap())).unwrap();
/// assert_eq!(decoded[0].uint32().unwrap(), 120);
/// assert_eq!(decoded[1].children[0].uint8().unwrap(), 6);
/// ```
pub fn decode_attributes(buf: &Bytes) -> Result<Vec<Attribute>> {
    decode_level(buf, 1)
}

fn decode_level(buf: &Bytes, depth: usize) -> Result<Vec<Attribute>> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ConntrackError::Netlink(format!(
            "attributes nested deeper than {} levels",
            MAX_NESTING_DEPTH
        )));
    }

    let mut attrs = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let rest = buf.len() - offset;
        if rest < ATTRIBUTE_HEADER_SIZE {
            return Err(ConntrackError::Netlink(format!(
                "{} trailing bytes after last attribute",
                rest
            )));
        }

        let len = u16::from_ne_bytes([buf[offset], buf[offset + 1]]) as usize;
        let wire_kind = u16::from_ne_bytes([buf[offset + 2], buf[offset + 3]]);
        if len < ATTRIBUTE_HEADER_SIZE || len > rest {
            return Err(ConntrackError::Netlink(format!(
                "attribute type {} has invalid length {} ({} bytes left)",
                wire_kind & NLA_TYPE_MASK,
                len,
                rest
            )));
        }

        let data = buf.slice(offset + ATTRIBUTE_HEADER_SIZE..offset + len);
        let nested = wire_kind & NLA_F_NESTED != 0;
        let children = if nested && !data.is_empty() {
            decode_level(&data, depth + 1)?
        } else {
            Vec::new()
        };

        attrs.push(Attribute {
            kind: wire_kind & NLA_TYPE_MASK,
            nested,
            net_byte_order: wire_kind & NLA_F_NET_BYTEORDER != 0,
            data,
            children,
        });

        offset += align(len);
    }

    Ok(attrs)
}

/// Encode a list of attributes into a single padded buffer.
pub fn encode_attributes(attrs: &[Attribute]) -> Result<Vec<u8>> {
    let total = attrs.iter().map(|a| align(a.encoded_len())).sum();
    let mut buf = Vec::with_capacity(total);
    for attr in attrs {
        attr.encode_into(&mut buf)?;
    }
    Ok(buf)
}
