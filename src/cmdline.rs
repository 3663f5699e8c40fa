//! Tokenizing the loader's text command line and reading `key=v1,v2,...`
//! option values.

use core::fmt;

use arrayvec::ArrayVec;

use crate::lexer::{parse_int, LexError};

/// Command-line whitespace. NUL is not whitespace; it ends the buffer.
pub fn is_space(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b'\n'
}

fn is_terminator(c: u8) -> bool {
    c == b'\0' || is_space(c)
}

/// Finds the next token at or after `cursor`.
///
/// Returns the token and the cursor just past it, or `None` once only
/// whitespace remains. A NUL byte ends the buffer early.
pub fn next_token(buf: &[u8], cursor: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(cursor..)?;
    let rest = match rest.iter().position(|&c| c == b'\0') {
        Some(nul) => &rest[..nul],
        None => rest,
    };

    let start = rest.iter().position(|&c| !is_space(c))?;
    let len = rest[start..]
        .iter()
        .position(|&c| is_space(c))
        .unwrap_or(rest.len() - start);

    let token = &rest[start..start + len];
    Some((token, cursor + start + len))
}

/// Iterator over the whitespace-separated tokens of a command line.
#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> Tokens<'a> {
    /// Starts tokenizing `buf` at `cursor`.
    pub fn new(buf: &'a [u8], cursor: usize) -> Self {
        Tokens { buf, cursor }
    }

    /// Position the next call to `next` scans from.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let (token, cursor) = next_token(self.buf, self.cursor)?;
        self.cursor = cursor;
        Some(token)
    }
}

pub fn tokens(buf: &[u8]) -> Tokens<'_> {
    Tokens::new(buf, 0)
}

/// Malformed value list in an option token. Values read before the error are
/// discarded with the token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueListError {
    /// A value was followed by something other than `,` or the end of the
    /// token.
    BadSeparator { index: usize, found: u8 },
    /// A `,` was not followed by a value.
    MissingValue { index: usize },
    /// More comma-separated values than the option takes.
    TooManyValues { max: usize },
    /// A value does not fit in 64 bits.
    Overflow { index: usize },
}

impl fmt::Display for ValueListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ValueListError::BadSeparator { index, found } => write!(
                f,
                "unexpected {:?} after value {}",
                found as char, index
            ),
            ValueListError::MissingValue { index } => {
                write!(f, "missing value {} after ','", index)
            }
            ValueListError::TooManyValues { max } => write!(f, "more than {} values", max),
            ValueListError::Overflow { index } => {
                write!(f, "value {} does not fit in 64 bits", index)
            }
        }
    }
}

/// Reads up to `N` comma-separated integers from an option token.
///
/// Values start after the first `=` in the token. If the token has no `=`,
/// values are read from the start of the token instead, so `"1,2"` reads as
/// two values while `"quiet"` reads as none.
///
/// An empty list means the first value position held no digits. Otherwise the
/// list holds every value in the token.
pub fn option_values<const N: usize>(token: &[u8]) -> Result<ArrayVec<u64, N>, ValueListError> {
    let token = match token.iter().position(|&c| is_terminator(c)) {
        Some(end) => &token[..end],
        None => token,
    };
    let mut pos = match token.iter().position(|&c| c == b'=') {
        Some(eq) => eq + 1,
        None => 0,
    };

    let mut values = ArrayVec::new();
    loop {
        let index = values.len();
        if index == N {
            return Err(ValueListError::TooManyValues { max: N });
        }

        let (value, len) = match parse_int(&token[pos..]) {
            Ok(parsed) => parsed,
            Err(LexError::Overflow) => return Err(ValueListError::Overflow { index }),
            Err(LexError::NoDigits) if index == 0 => return Ok(values),
            Err(LexError::NoDigits) => return Err(ValueListError::MissingValue { index }),
        };
        values.push(value);
        pos += len;

        match token.get(pos) {
            None => return Ok(values),
            Some(b',') => pos += 1,
            Some(&found) => return Err(ValueListError::BadSeparator { index, found }),
        }
    }
}
