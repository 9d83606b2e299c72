//! Fixed-width base62 numerals over byte strings
//!
//! A byte string is read as one big-endian unsigned integer and written in
//! the alphabet `0-9a-zA-Z`, left-padded with `'0'` to a minimum width.
//! Because 62 is not a power of two the width needed for `n` bytes is not
//! constant: 44 bytes need 59 characters for most values and 60 for the
//! largest ones. Decoding accepts either and rejects values that do not fit
//! the target byte length.

use tessera_core::{Error, Result};

/// Digit alphabet, lowest value first
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: u32 = 62;

fn digit_value(c: u8) -> Option<u32> {
    match c {
        b'0'..=b'9' => Some(u32::from(c - b'0')),
        b'a'..=b'z' => Some(u32::from(c - b'a') + 10),
        b'A'..=b'Z' => Some(u32::from(c - b'A') + 36),
        _ => None,
    }
}

/// Encode `bytes` as base62, left-padded with `'0'` to at least `min_width`
#[must_use]
pub fn encode(bytes: &[u8], min_width: usize) -> String {
    let mut number = bytes.to_vec();
    let mut digits = Vec::with_capacity(min_width.max(bytes.len() * 4 / 3 + 1));

    // Repeated long division by 62, least significant digit first
    let mut start = number.iter().position(|&b| b != 0).unwrap_or(number.len());
    while start < number.len() {
        let mut remainder = 0u32;
        for byte in &mut number[start..] {
            let acc = (remainder << 8) | u32::from(*byte);
            *byte = (acc / BASE) as u8;
            remainder = acc % BASE;
        }
        digits.push(ALPHABET[remainder as usize]);
        while start < number.len() && number[start] == 0 {
            start += 1;
        }
    }

    while digits.len() < min_width {
        digits.push(b'0');
    }
    digits.reverse();

    // Every byte comes from ALPHABET
    digits.into_iter().map(char::from).collect()
}

/// Decode a base62 numeral into exactly `N` big-endian bytes
///
/// # Errors
/// Returns [`Error::Format`] for an empty input, a character outside the
/// alphabet, or a value that does not fit in `N` bytes
pub fn decode<const N: usize>(encoded: &str) -> Result<[u8; N]> {
    if encoded.is_empty() {
        return Err(Error::format("Empty base62 field"));
    }

    let mut out = [0u8; N];
    for c in encoded.bytes() {
        let mut carry = digit_value(c).ok_or_else(|| {
            Error::format(format!("Invalid base62 character {:?}", char::from(c)))
        })?;

        for byte in out.iter_mut().rev() {
            let acc = u32::from(*byte) * BASE + carry;
            *byte = (acc & 0xff) as u8;
            carry = acc >> 8;
        }

        if carry != 0 {
            return Err(Error::format(format!(
                "Base62 value does not fit in {N} bytes"
            )));
        }
    }

    Ok(out)
}
