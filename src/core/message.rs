/// Protobuf wire message builder
///
/// Requests are assembled field by field without a `.proto` schema. The
/// server is positional, so each request helper emits its fields in a
/// fixed order.

use crate::core::varint::write_varint;

/// The two wire types this protocol uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    LengthDelimited = 2,
}

impl WireType {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Varint),
            2 => Some(Self::LengthDelimited),
            _ => None,
        }
    }
}

/// Field key as it appears on the wire: `(field << 3) | wire_type`
pub fn field_key(field: u32, wire_type: WireType) -> u64 {
    (u64::from(field) << 3) | wire_type as u64
}

/// Request-type discriminant every query sends in field 1
pub const REQUEST_TYPE: u64 = 1;

#[derive(Debug, Default, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a varint field
    pub fn varint(mut self, field: u32, value: u64) -> Self {
        write_varint(&mut self.buf, field_key(field, WireType::Varint));
        write_varint(&mut self.buf, value);
        self
    }

    /// Append a length-delimited field. The length is a full varint.
    pub fn bytes(mut self, field: u32, value: &[u8]) -> Self {
        write_varint(&mut self.buf, field_key(field, WireType::LengthDelimited));
        write_varint(&mut self.buf, value.len() as u64);
        self.buf.extend_from_slice(value);
        self
    }

    pub fn string(self, field: u32, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

pub fn write_varint_field(field: u32, value: u64) -> Vec<u8> {
    MessageBuilder::new().varint(field, value).build()
}

pub fn write_bytes_field(field: u32, value: &[u8]) -> Vec<u8> {
    MessageBuilder::new().bytes(field, value).build()
}

pub fn write_string_field(field: u32, value: &str) -> Vec<u8> {
    MessageBuilder::new().string(field, value).build()
}

// Request payloads

/// `{1: request_type}`, used by GetSignatureMessage and the vesting queries
pub fn simple_request(request_type: u64) -> Vec<u8> {
    write_varint_field(1, request_type)
}

/// VerifySignature body: request type, address, raw signature, nonce, wallet type
pub fn verify_signature_request(
    address: &str,
    signature: &[u8],
    nonce: &str,
    wallet_type: &str,
) -> Vec<u8> {
    MessageBuilder::new()
        .varint(1, REQUEST_TYPE)
        .string(2, address)
        .bytes(3, signature)
        .string(4, nonce)
        .string(5, wallet_type)
        .build()
}
