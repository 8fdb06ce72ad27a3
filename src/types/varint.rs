//! Variable-length integer encoding used by the b-tree file format.
//!
//! Values are stored big-endian in 1-9 bytes. The first eight bytes carry
//! 7 bits each with the high bit as a continuation flag; a ninth byte, if
//! reached, contributes all 8 of its bits.

/// Maximum encoded length of a varint
pub const MAX_VARINT_LEN: usize = 9;

/// Encode a u64 as a variable-length integer.
#[cfg(test)]
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value & 0xFF00_0000_0000_0000 != 0 {
        let mut buf = vec![0u8; MAX_VARINT_LEN];
        buf[8] = value as u8;
        let mut rest = value >> 8;
        for byte in buf[..8].iter_mut().rev() {
            *byte = (rest & 0x7F) as u8 | 0x80;
            rest >>= 7;
        }
        return buf;
    }

    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    let mut rest = value;
    loop {
        buf.push((rest & 0x7F) as u8 | 0x80);
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    // The last byte emitted is the least significant group and ends the varint.
    buf[0] &= 0x7F;
    buf.reverse();
    buf
}

/// Decode a variable-length integer from a byte slice.
///
/// Returns the decoded value and the number of bytes consumed, or `None`
/// if the slice ends before the varint does.
pub fn decode_varint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;

    for i in 0..8 {
        let byte = *bytes.get(i)?;
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }

    let byte = *bytes.get(8)?;
    Some(((value << 8) | u64::from(byte), MAX_VARINT_LEN))
}

/// Length in bytes of the varint at the start of `bytes`, without decoding it.
pub fn varint_len(bytes: &[u8]) -> Option<usize> {
    for i in 0..8 {
        if *bytes.get(i)? & 0x80 == 0 {
            return Some(i + 1);
        }
    }
    bytes.get(8).map(|_| MAX_VARINT_LEN)
}
