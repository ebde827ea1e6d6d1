//! Conversion between integers and their fixed-width, big-endian byte representation.
//!
//! **Signed values use sign-magnitude, not two's-complement.** The most significant bit of the
//! first byte is the sign, and the remaining bits hold the absolute value. This differs from the
//! encoding real CPUs use: `-1` on one byte is `0x81`, not `0xFF`, and `0x80` decodes to zero.
//!
//! Range checks are driven by the magnitude of the value against the unsigned maximum of the
//! width, so a non-negative value up to that maximum is always accepted, whatever the
//! signedness of the slot it ends up in. Negative values get the same bound. A negative magnitude
//! that reaches the sign bit merges into it, which loses information: `-128` on one byte is stored
//! as `0x80` and reads back as `0`, `-200` is stored as `0xC8` and reads back as `-72`.

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::constants::Integer;
use crate::types::ByteSize;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("{value} is too big for size {size}")]
    OutOfRange { value: Integer, size: ByteSize },
}

const SIGN_BIT: u8 = 0x80;

/// Check that a value can be encoded on the given size
///
/// # Errors
///
/// Fails with [`CodecError::OutOfRange`] if the magnitude of the value exceeds the unsigned
/// maximum of the size.
pub fn check(value: Integer, size: ByteSize) -> Result<(), CodecError> {
    let magnitude = value.unsigned_abs();
    #[allow(clippy::cast_sign_loss)]
    let max = size.max_unsigned() as u128;

    if magnitude > max {
        Err(CodecError::OutOfRange { value, size })
    } else {
        Ok(())
    }
}

/// Values a slot reads back unchanged
///
/// This is narrower than what [`check`] accepts on signed slots: the magnitude has to stay below
/// the sign bit, so a signed byte holds `-127..=127`.
#[must_use]
pub fn exact_range(size: ByteSize, signed: bool) -> RangeInclusive<Integer> {
    let max = size.max_unsigned();
    if signed {
        -(max >> 1)..=max >> 1
    } else {
        0..=max
    }
}

/// Encode a value on `size` big-endian bytes
///
/// # Errors
///
/// Fails with [`CodecError::OutOfRange`] if the value does not fit, see [`check`].
pub fn encode(value: Integer, size: ByteSize) -> Result<Vec<u8>, CodecError> {
    check(value, size)?;

    let magnitude = value.unsigned_abs().to_be_bytes();
    let mut bytes = magnitude[magnitude.len() - size.bytes()..].to_vec();
    if value < 0 {
        bytes[0] |= SIGN_BIT;
    }

    Ok(bytes)
}

/// Decode big-endian bytes into a value
///
/// When `signed` is set, the top bit of the first byte is read as the sign of the magnitude held
/// by the remaining bits.
#[must_use]
pub fn decode(bytes: &[u8], signed: bool) -> Integer {
    debug_assert!(bytes.len() <= 8, "values are at most 8 bytes wide");

    let negative = signed && bytes.first().is_some_and(|b| b & SIGN_BIT != 0);
    let magnitude = bytes.iter().enumerate().fold(0, |acc: Integer, (i, &b)| {
        let b = if i == 0 && negative { b & !SIGN_BIT } else { b };
        (acc << 8) | Integer::from(b)
    });

    if negative {
        -magnitude
    } else {
        magnitude
    }
}
