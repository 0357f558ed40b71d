//!
//! Bitcoin compact-size integers.
//!
//! The first byte selects the width: below `0xfd` it is the value itself,
//! `0xfd`, `0xfe` and `0xff` announce a little-endian `u16`, `u32` or `u64`.
//!
use crate::parser::errors::{OpError, OpResult};
use byteorder::{ByteOrder, LittleEndian};

const PREFIX_U16: u8 = 0xfd;
const PREFIX_U32: u8 = 0xfe;
const PREFIX_U64: u8 = 0xff;

/// Decode a compact-size integer at `offset`.
///
/// Returns the value and the number of bytes consumed (1, 3, 5 or 9).
pub fn decode_varint(buf: &[u8], offset: usize) -> OpResult<(u64, usize)> {
    let prefix = match buf.get(offset) {
        Some(b) => *b,
        None => return Err(OpError::truncated(offset, 1, 0)),
    };
    let width = match prefix {
        PREFIX_U16 => 3,
        PREFIX_U32 => 5,
        PREFIX_U64 => 9,
        _ => return Ok((prefix as u64, 1)),
    };
    let available = buf.len() - offset;
    if available < width {
        return Err(OpError::truncated(offset, width, available));
    }
    let body = &buf[offset + 1..offset + width];
    let value = match prefix {
        PREFIX_U16 => LittleEndian::read_u16(body) as u64,
        PREFIX_U32 => LittleEndian::read_u32(body) as u64,
        _ => LittleEndian::read_u64(body),
    };
    Ok((value, width))
}

/// Number of bytes the minimal encoding of `value` takes.
#[inline]
pub fn varint_len(value: u64) -> usize {
    if value < PREFIX_U16 as u64 {
        1
    } else if value <= 0xffff {
        3
    } else if value <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Minimal compact-size encoding of `value`.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(varint_len(value));
    match varint_len(value) {
        1 => out.push(value as u8),
        3 => {
            out.push(PREFIX_U16);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        5 => {
            out.push(PREFIX_U32);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            out.push(PREFIX_U64);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}
