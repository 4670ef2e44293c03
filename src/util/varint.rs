//! Variable-length integer encoding utilities.
//!
//! Seven payload bits per byte, least significant group first, high bit set
//! on every byte except the last.

use crate::error::{NotedexError, Result};

/// Maximum encoded length of a u64.
pub const MAX_VARINT_LEN: usize = 10;

/// Append the variable-length encoding of `value` to `out`.
pub fn encode_u64_into(value: u64, out: &mut Vec<u8>) {
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80;
        }

        out.push(byte);

        if val == 0 {
            break;
        }
    }
}

/// Encode a u64 value using variable-length encoding.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MAX_VARINT_LEN);
    encode_u64_into(value, &mut bytes);
    bytes
}

/// Decode a u64 value from variable-length encoding.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;
    let mut bytes_read = 0;

    for &byte in bytes {
        bytes_read += 1;

        if shift >= 64 {
            return Err(NotedexError::corrupt("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, bytes_read));
        }

        shift += 7;
    }

    Err(NotedexError::corrupt("Incomplete VarInt"))
}
