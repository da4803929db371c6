//! SLIP-like escape codec.
//!
//! The raw byte `0x00` is reserved as the bus separator, so inside a frame
//! body it travels as `0xDB 0xDC`; the escape byte itself travels as
//! `0xDB 0xDD`. Every other byte passes through unchanged.
//!
//! ```text
//! payload:  DB 00
//! wire:     DB DD DB DC
//! ```
use crate::core::{END, ESCAPE, ESC_END, ESC_ESC};
use crate::error::{DecodeError, EncodeError};

//==================================================================================ENCODER
/// One payload byte after escaping: either passed through or expanded to a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaped {
    Single(u8),
    Pair(u8, u8),
}

impl Escaped {
    /// Number of wire bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        match self {
            Escaped::Single(_) => 1,
            Escaped::Pair(_, _) => 2,
        }
    }

    /// Wire bytes as a fixed array plus the number of valid entries.
    #[inline]
    pub const fn to_bytes(self) -> ([u8; 2], usize) {
        match self {
            Escaped::Single(b) => ([b, 0], 1),
            Escaped::Pair(a, b) => ([a, b], 2),
        }
    }
}

/// Escape a single payload byte.
#[inline]
pub const fn encode_byte(byte: u8) -> Escaped {
    match byte {
        END => Escaped::Pair(ESCAPE, ESC_END),
        ESCAPE => Escaped::Pair(ESCAPE, ESC_ESC),
        other => Escaped::Single(other),
    }
}

/// Length of `data` once escaped (terminator not included).
pub fn encoded_len(data: &[u8]) -> usize {
    data.iter().map(|&b| encode_byte(b).len()).sum()
}

/// Escape `data` into `out` and return the number of bytes written.
///
/// Nothing is written when `out` is too small.
pub fn encode_into(data: &[u8], out: &mut [u8]) -> Result<usize, EncodeError> {
    let needed = encoded_len(data);
    if needed > out.len() {
        return Err(EncodeError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    let mut cursor = 0;
    for &byte in data {
        let (bytes, len) = encode_byte(byte).to_bytes();
        out[cursor..cursor + len].copy_from_slice(&bytes[..len]);
        cursor += len;
    }
    Ok(cursor)
}

/// Lazy iterator yielding the escaped form of a payload byte by byte.
pub struct SlipEncoder<'a> {
    data: &'a [u8],
    index: usize,
    pending: Option<u8>,
}

impl<'a> SlipEncoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            index: 0,
            pending: None,
        }
    }
}

impl Iterator for SlipEncoder<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if let Some(second) = self.pending.take() {
            return Some(second);
        }

        let byte = *self.data.get(self.index)?;
        self.index += 1;

        match encode_byte(byte) {
            Escaped::Single(b) => Some(b),
            Escaped::Pair(first, second) => {
                self.pending = Some(second);
                Some(first)
            }
        }
    }
}

//==================================================================================DECODER
/// Outcome of feeding one wire byte to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A payload byte was recovered.
    Byte(u8),
    /// Escape prefix consumed; the next byte completes it.
    Pending,
    /// Raw separator: the current frame is over.
    Terminator,
}

/// Incremental decoder. The only state is the pending-escape flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlipDecoder {
    escaped: bool,
}

impl SlipDecoder {
    pub const fn new() -> Self {
        Self { escaped: false }
    }

    /// Forget a dangling escape prefix.
    #[inline]
    pub fn reset(&mut self) {
        self.escaped = false;
    }

    /// `true` while an escape prefix waits for its second byte.
    #[inline]
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    /// Feed one wire byte.
    ///
    /// An invalid escape sequence clears the pending flag and drops the byte;
    /// the caller decides whether to keep the frame.
    pub fn feed(&mut self, byte: u8) -> Result<Decoded, DecodeError> {
        // A raw END always wins, even right after an escape prefix.
        if byte == END {
            self.escaped = false;
            return Ok(Decoded::Terminator);
        }

        if self.escaped {
            self.escaped = false;
            return match byte {
                ESC_END => Ok(Decoded::Byte(END)),
                ESC_ESC => Ok(Decoded::Byte(ESCAPE)),
                other => Err(DecodeError::InvalidEscape { byte: other }),
            };
        }

        if byte == ESCAPE {
            self.escaped = true;
            Ok(Decoded::Pending)
        } else {
            Ok(Decoded::Byte(byte))
        }
    }
}
