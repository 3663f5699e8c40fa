//! Unsigned integer lexing for command-line option values.

use core::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LexError {
    /// The text at the cursor held no digits in the expected radix.
    NoDigits,
    /// The digits describe a value that does not fit in 64 bits.
    Overflow,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::NoDigits => write!(f, "expected an integer"),
            LexError::Overflow => write!(f, "integer does not fit in 64 bits"),
        }
    }
}

/// Parses one unsigned integer at the start of `text`.
///
/// Text beginning with `0x` is read as hexadecimal, anything else as decimal.
/// Returns the value and the index of the first byte that was not consumed.
/// A value that does not fit in 64 bits is an error, never a clamped value.
pub fn parse_int(text: &[u8]) -> Result<(u64, usize), LexError> {
    match text {
        [b'0', b'x', rest @ ..] => {
            let (value, len) = parse_digits(rest, 16)?;
            Ok((value, 2 + len))
        }
        _ => parse_digits(text, 10),
    }
}

fn parse_digits(text: &[u8], radix: u32) -> Result<(u64, usize), LexError> {
    let mut value: u64 = 0;
    let mut len = 0;

    for digit in text.iter().map_while(|&c| (c as char).to_digit(radix)) {
        value = value
            .checked_mul(radix as u64)
            .and_then(|v| v.checked_add(digit as u64))
            .ok_or(LexError::Overflow)?;
        len += 1;
    }

    if len == 0 {
        return Err(LexError::NoDigits);
    }

    Ok((value, len))
}
