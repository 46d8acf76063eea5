/// gRPC-Web length-prefix framing
///
/// ```text
/// ┌──────────┬──────────────┬─────────────┐
/// │ Flag     │ Length       │ Payload     │
/// │ 1 byte   │ 4 bytes      │ Length bytes│
/// │ 0x00     │ uint32 BE    │ protobuf    │
/// └──────────┴──────────────┴─────────────┘
/// ```
///
/// Only uncompressed data frames are handled. A trailer frame that follows
/// the data frame is ignored.

use crate::core::error::WireError;

pub const FRAME_HEADER_SIZE: usize = 5;

/// Flag byte of an uncompressed data frame
pub const UNCOMPRESSED: u8 = 0x00;

/// Wrap a payload in a single data frame
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    out.push(UNCOMPRESSED);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Strip the frame prefix and return the payload of the first data frame
pub fn unframe(response: &[u8]) -> Result<&[u8], WireError> {
    if response.len() < FRAME_HEADER_SIZE {
        return Err(WireError::FrameTooShort { len: response.len() });
    }

    let flag = response[0];
    if flag != UNCOMPRESSED {
        return Err(WireError::UnsupportedCompression { flag });
    }

    let declared = u32::from_be_bytes([response[1], response[2], response[3], response[4]]);
    let end = FRAME_HEADER_SIZE
        .checked_add(declared as usize)
        .filter(|&end| end <= response.len())
        .ok_or(WireError::TruncatedInput {
            offset: FRAME_HEADER_SIZE,
            field: None,
        })?;

    Ok(&response[FRAME_HEADER_SIZE..end])
}
