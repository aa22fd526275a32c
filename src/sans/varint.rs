//! State token for base-128 variable-length integers.
//!
//! Each byte carries seven payload bits, least-significant group first, and a
//! continuation flag in its high bit. At most [`MAX_GROUPS`] bytes are
//! accepted; payload bits beyond the 32nd are discarded. The same token backs
//! both the byte-aligned frame header fields and the bit cursor.

use either::Either::{self, Left, Right};
use thiserror::Error;

/// Maximum number of 7-bit groups in an encoded integer.
pub const MAX_GROUPS: u32 = 5;

/// A variable-length integer continued past [`MAX_GROUPS`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Variable-length integer continues past {MAX_GROUPS} bytes.")]
pub struct VarIntTooLong;

/// State token to decode a variable-length integer.
#[derive(Debug, Default, Clone, Copy)]
pub struct VarInt {
    value: u32,
    groups: u32,
}

impl VarInt {
    /// Begin decoding a new integer.
    pub const fn new() -> Self {
        Self {
            value: 0,
            groups: 0,
        }
    }

    /// Whether no byte has been consumed yet.
    pub fn is_empty(&self) -> bool {
        self.groups == 0
    }

    /// Transition to another state by decoding one byte.
    ///
    /// Returns the decoded integer once a byte without the continuation flag
    /// is seen, or a successor state token otherwise.
    pub fn advance(self, r: [u8; 1]) -> Result<Either<Self, u32>, VarIntTooLong> {
        let [b] = r;

        let value = self.value | (u32::from(b & 0x7F) << (7 * self.groups));
        let groups = self.groups + 1;

        if b & 0x80 == 0 {
            Ok(Right(value))
        } else if groups == MAX_GROUPS {
            Err(VarIntTooLong)
        } else {
            Ok(Left(Self { value, groups }))
        }
    }
}
