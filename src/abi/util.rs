//! Utility module

use std::convert::TryFrom;

use crate::types::{H256, U256};

/// Size of an ABI word in bytes.
pub const WORD: usize = 32;

pub type Word = [u8; WORD];

/// Converts usize to right aligned array of 32 bytes.
pub fn pad_usize(value: usize) -> Word {
    let mut padded = [0u8; WORD];
    padded[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    padded
}

/// Converts a 256-bit integer to its big-endian word.
pub fn pad_uint(value: &U256) -> Word {
    H256::from(value).to_fixed_bytes()
}

/// Reads a word holding a count or offset. `None` if it does not fit in a `usize`.
pub fn read_usize(word: &[u8]) -> Option<usize> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return None;
    }
    let mut be = [0u8; 8];
    be.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(be)).ok()
}

/// `len` rounded up to a whole number of words.
pub fn padded_len(len: usize) -> Option<usize> {
    match len % WORD {
        0 => Some(len),
        rem => len.checked_add(WORD - rem),
    }
}

/// Whether `value` fits in an unsigned integer of `bits` bits.
pub fn fits_unsigned(value: &U256, bits: u16) -> bool {
    value.bits() <= bits as usize
}

/// Whether the two's complement `value` fits in a signed integer of `bits` bits,
/// i.e. every bit above `bits - 1` is a copy of the sign bit.
pub fn fits_signed(value: &U256, bits: u16) -> bool {
    if bits >= 256 {
        return true;
    }
    let high = *value >> (bits as usize - 1);
    if value.bit(255) {
        high == U256::max_value() >> (bits as usize - 1)
    } else {
        high.is_zero()
    }
}

/// Whether the leading `WORD - width` bytes of `word` are zero.
pub fn is_zero_extended(word: &[u8], width: usize) -> bool {
    word[..WORD - width].iter().all(|b| *b == 0)
}

/// Whether the leading `WORD - width` bytes of `word` sign-extend the remaining bytes.
pub fn is_sign_extended(word: &[u8], width: usize) -> bool {
    let pad = WORD - width;
    if pad == 0 {
        return true;
    }
    let fill = if word[pad] & 0x80 != 0 { 0xff } else { 0x00 };
    word[..pad].iter().all(|b| *b == fill)
}

/// Two's complement 256-bit representation of `value`.
pub fn int_from_i128(value: i128) -> U256 {
    let magnitude = U256::from(value.unsigned_abs());
    if value < 0 {
        negate(magnitude)
    } else {
        magnitude
    }
}

/// Reads a two's complement 256-bit integer back, if it fits in an `i128`.
pub fn int_to_i128(value: &U256) -> Option<i128> {
    if !fits_signed(value, 128) {
        return None;
    }
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    let mut be = [0u8; 16];
    be.copy_from_slice(&word[16..]);
    Some(i128::from_be_bytes(be))
}

pub fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}
