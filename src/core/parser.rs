/// Schema-less protobuf wire parser
///
/// Walks a buffer field by field and recovers every value as an integer,
/// UTF-8 text or opaque bytes. Opaque bytes are speculatively re-parsed as
/// a nested message; the nested view is kept only when it consumes the
/// whole byte range without error.
///
/// Only wire types 0 (varint) and 2 (length-delimited) are accepted. Any
/// other wire type means the server schema drifted, so it is reported as
/// an error instead of being skipped.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, trace};

use crate::core::error::WireError;
use crate::core::message::WireType;
use crate::core::varint::decode_varint;

/// Nested re-parsing stops at this depth
pub const MAX_NESTING_DEPTH: usize = 16;

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    UnsignedInteger(u64),
    Text(String),
    Bytes(Vec<u8>),
    NestedMessage(ParsedMessage),
}

impl WireValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WireValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            WireValue::UnsignedInteger(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&ParsedMessage> {
        match self {
            WireValue::NestedMessage(message) => Some(message),
            _ => None,
        }
    }

    /// Text form of the value; opaque bytes are shown as base64
    pub fn display_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::UnsignedInteger(value) => write!(f, "{}", value),
            WireValue::Text(text) => f.write_str(text),
            WireValue::Bytes(bytes) => f.write_str(&STANDARD.encode(bytes)),
            WireValue::NestedMessage(message) => write!(f, "{}", message),
        }
    }
}

/// Map key for a parsed field. `Nested(n)` holds the nested-message view
/// of the opaque bytes stored under `Field(n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Field(u32),
    Nested(u32),
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Field(n) => write!(f, "field_{}", n),
            FieldKey::Nested(n) => write!(f, "field_{}_nested", n),
        }
    }
}

/// Field map in wire order. A repeated field overwrites the earlier value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    entries: Vec<(FieldKey, WireValue)>,
}

impl ParsedMessage {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: FieldKey, value: WireValue) {
        if let FieldKey::Field(n) = key {
            // a fresh value invalidates the nested view of the previous one
            self.entries.retain(|(k, _)| *k != FieldKey::Nested(n));
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, field: u32) -> Option<&WireValue> {
        self.get_key(FieldKey::Field(field))
    }

    pub fn get_key(&self, key: FieldKey) -> Option<&WireValue> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Nested-message view of field `field`, if its bytes parsed as one
    pub fn nested(&self, field: u32) -> Option<&ParsedMessage> {
        self.get_key(FieldKey::Nested(field)).and_then(WireValue::as_nested)
    }

    pub fn text(&self, field: u32) -> Option<&str> {
        self.get(field).and_then(WireValue::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &WireValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ParsedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}")
    }
}

enum ParseState {
    ReadHeader,
    ReadVarintValue { field: u32 },
    ReadLengthThenBytes { field: u32 },
    Done,
}

/// Parse a complete protobuf payload
pub fn parse_message(buf: &[u8]) -> Result<ParsedMessage, WireError> {
    debug!(len = buf.len(), hex = %hex::encode(buf), "parsing protobuf payload");
    parse_at_depth(buf, 0)
}

fn with_field(err: WireError, field: u32) -> WireError {
    match err {
        WireError::TruncatedInput { offset, .. } => WireError::TruncatedInput {
            offset,
            field: Some(field),
        },
        other => other,
    }
}

fn parse_at_depth(buf: &[u8], depth: usize) -> Result<ParsedMessage, WireError> {
    let mut message = ParsedMessage::new();
    let mut cursor = 0usize;
    let mut state = ParseState::ReadHeader;

    loop {
        state = match state {
            ParseState::ReadHeader => {
                if cursor >= buf.len() {
                    ParseState::Done
                } else {
                    let header_offset = cursor;
                    let (key, next) = decode_varint(buf, cursor)?;
                    cursor = next;

                    let field = u32::try_from(key >> 3)
                        .ok()
                        .filter(|&n| n != 0)
                        .ok_or(WireError::InvalidFieldNumber { offset: header_offset })?;
                    let wire_bits = (key & 0x07) as u8;

                    match WireType::from_bits(wire_bits) {
                        Some(WireType::Varint) => ParseState::ReadVarintValue { field },
                        Some(WireType::LengthDelimited) => ParseState::ReadLengthThenBytes { field },
                        None => {
                            return Err(WireError::UnknownWireType {
                                wire_type: wire_bits,
                                field,
                                offset: header_offset,
                            })
                        }
                    }
                }
            }
            ParseState::ReadVarintValue { field } => {
                let (value, next) =
                    decode_varint(buf, cursor).map_err(|e| with_field(e, field))?;
                cursor = next;
                if depth == 0 {
                    debug!(field, value, "varint field");
                }
                message.insert(FieldKey::Field(field), WireValue::UnsignedInteger(value));
                ParseState::ReadHeader
            }
            ParseState::ReadLengthThenBytes { field } => {
                let (len, start) =
                    decode_varint(buf, cursor).map_err(|e| with_field(e, field))?;
                let end = usize::try_from(len)
                    .ok()
                    .and_then(|len| start.checked_add(len))
                    .filter(|&end| end <= buf.len())
                    .ok_or(WireError::TruncatedInput {
                        offset: start,
                        field: Some(field),
                    })?;
                let raw = &buf[start..end];
                cursor = end;

                match std::str::from_utf8(raw) {
                    Ok(text) => {
                        if depth == 0 {
                            debug!(field, text, "string field");
                        }
                        message.insert(FieldKey::Field(field), WireValue::Text(text.to_owned()));
                    }
                    Err(_) => {
                        if depth == 0 {
                            debug!(field, len = raw.len(), hex = %hex::encode(raw), "bytes field");
                        }
                        message.insert(FieldKey::Field(field), WireValue::Bytes(raw.to_vec()));
                        if let Some(nested) = try_nested(raw, depth) {
                            debug!(field, depth, nested = %nested, "nested message");
                            message.insert(FieldKey::Nested(field), WireValue::NestedMessage(nested));
                        }
                    }
                }
                ParseState::ReadHeader
            }
            ParseState::Done => return Ok(message),
        };
    }
}

/// Speculative nested parse. Accepted only on a clean, complete, non-empty parse.
fn try_nested(raw: &[u8], depth: usize) -> Option<ParsedMessage> {
    if depth + 1 >= MAX_NESTING_DEPTH {
        return None;
    }
    match parse_at_depth(raw, depth + 1) {
        Ok(nested) if !nested.is_empty() => Some(nested),
        Ok(_) => None,
        Err(err) => {
            trace!(%err, "bytes are not a nested message");
            None
        }
    }
}
