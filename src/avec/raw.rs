//! Schema-less decoding of protobuf messages.
//!
//! Fields are kept by number, in wire order. Length-delimited values are
//! interpreted as printable text, then as a nested message, and otherwise
//! kept as bytes. Nesting deeper than [`RECURSION_LIMIT`] is kept as bytes.

use std::{string::String, vec::Vec};

use prost::{
    bytes::Buf,
    encoding::{WireType, decode_key, decode_varint},
};
use thiserror::Error;

/// Deepest nested message decoded; matches prost's own limit.
pub const RECURSION_LIMIT: u32 = 100;

/// An error decoding protobuf wire data.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed key or varint.
    #[error(transparent)]
    Wire(#[from] prost::DecodeError),
    /// A fixed-width or length-delimited value runs past the message.
    #[error("Field {field} needs {needed} bytes, but {remaining} remain.")]
    Overrun {
        field: u32,
        needed: u64,
        remaining: usize,
    },
    /// Found a deprecated group field (not supported).
    #[error("Found unsupported group field {0}.")]
    Group(u32),
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Text(String),
    Message(RawMessage),
    Bytes(Vec<u8>),
}

/// A numbered field.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub number: u32,
    pub value: RawValue,
}

/// A protobuf message decoded without its schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMessage {
    pub fields: Vec<RawField>,
}

impl RawMessage {
    /// Decode every field of a message.
    pub fn decode(r: &[u8]) -> Result<Self, Error> {
        Self::decode_at(r, 0)
    }

    fn decode_at(mut r: &[u8], depth: u32) -> Result<Self, Error> {
        let mut fields = Vec::new();

        while r.has_remaining() {
            let (number, wire_type) = decode_key(&mut r)?;

            let value = match wire_type {
                WireType::Varint => RawValue::Varint(decode_varint(&mut r)?),
                WireType::SixtyFourBit => {
                    take(&r, number, 8)?;
                    RawValue::Fixed64(r.get_u64_le())
                }
                WireType::ThirtyTwoBit => {
                    take(&r, number, 4)?;
                    RawValue::Fixed32(r.get_u32_le())
                }
                WireType::LengthDelimited => {
                    let len = decode_varint(&mut r)?;
                    let len = take(&r, number, len)?;
                    let (value, rest) = r.split_at(len);
                    r = rest;
                    RawValue::delimited(value, depth)
                }
                WireType::StartGroup | WireType::EndGroup => Err(Error::Group(number))?,
            };

            fields.push(RawField { number, value });
        }

        Ok(Self { fields })
    }

    /// Values of every field with a given number.
    pub fn get(&self, number: u32) -> impl Iterator<Item = &RawValue> {
        self.fields
            .iter()
            .filter(move |f| f.number == number)
            .map(|f| &f.value)
    }
}

impl RawValue {
    fn delimited(r: &[u8], depth: u32) -> Self {
        if let Ok(text) = std::str::from_utf8(r) {
            if !text.chars().any(char::is_control) {
                return Self::Text(text.into());
            }
        }

        if depth >= RECURSION_LIMIT {
            return Self::Bytes(r.to_vec());
        }

        match RawMessage::decode_at(r, depth + 1) {
            Ok(message) if !message.fields.is_empty() => Self::Message(message),
            _ => Self::Bytes(r.to_vec()),
        }
    }
}

/// Check that `needed` bytes remain, returning the count as a `usize`.
fn take(r: &[u8], field: u32, needed: u64) -> Result<usize, Error> {
    if needed > r.len() as u64 {
        Err(Error::Overrun {
            field,
            needed,
            remaining: r.len(),
        })?;
    }

    Ok(needed as usize)
}

#[cfg(feature = "serde")]
mod ser {
    use std::{collections::BTreeMap, vec::Vec};

    use serde::{Serialize, Serializer, ser::SerializeMap};

    use super::{RawMessage, RawValue};

    /// Serializes as a map from field number to value, or to a list of
    /// values for repeated fields.
    impl Serialize for RawMessage {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            let mut grouped: BTreeMap<u32, Vec<&RawValue>> = BTreeMap::new();
            for field in &self.fields {
                grouped.entry(field.number).or_default().push(&field.value);
            }

            let mut map = s.serialize_map(Some(grouped.len()))?;
            for (number, values) in &grouped {
                match values.as_slice() {
                    [value] => map.serialize_entry(number, value)?,
                    values => map.serialize_entry(number, values)?,
                }
            }
            map.end()
        }
    }

    impl Serialize for RawValue {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            match self {
                Self::Varint(v) | Self::Fixed64(v) => s.serialize_u64(*v),
                Self::Fixed32(v) => s.serialize_u32(*v),
                Self::Text(v) => s.serialize_str(v),
                Self::Message(v) => v.serialize(s),
                Self::Bytes(v) => s.serialize_bytes(v),
            }
        }
    }
}
