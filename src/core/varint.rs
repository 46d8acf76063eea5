/// Unsigned base-128 varints, the primitive under every protobuf field

use crate::core::error::WireError;

/// Continuation bit set on every byte except the last
const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7f;

/// Longest encoding of a u64 (ceil(64 / 7))
pub const MAX_VARINT_LEN: usize = 10;

/// Encode a value as little-endian groups of 7 bits
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    write_varint(&mut out, value);
    out
}

/// Append the encoding of `value` to `out`
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= u64::from(CONTINUATION) {
        out.push((value as u8 & PAYLOAD_MASK) | CONTINUATION);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Decode a varint starting at `offset`.
///
/// Returns the value and the offset just past its last byte. Bits beyond
/// the width of a u64 are dropped rather than overflowing the shift.
pub fn decode_varint(buf: &[u8], offset: usize) -> Result<(u64, usize), WireError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut pos = offset;

    loop {
        let byte = *buf
            .get(pos)
            .ok_or(WireError::TruncatedInput { offset: pos, field: None })?;
        pos += 1;

        if shift < 64 {
            value |= u64::from(byte & PAYLOAD_MASK) << shift;
        }
        if byte & CONTINUATION == 0 {
            return Ok((value, pos));
        }
        shift += 7;
    }
}
