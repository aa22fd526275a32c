//! Bit-granular reads over a byte buffer.
//!
//! Bits are consumed least-significant first within each byte. Every read is
//! all-or-nothing: on failure the cursor position is left where it was before
//! the call.

use alloc::{borrow::Cow, vec::Vec};

use either::Either::{Left, Right};
use thiserror::Error;

use super::varint::{VarInt, VarIntTooLong};

/// Widest supported fixed-width read, in bits.
pub const MAX_WIDTH: u32 = 32;

/// An error reading from a bit cursor. Positions are in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Fewer bits remain than were requested.
    #[error("Reached the end of the buffer reading {requested} bits at bit {position}.")]
    EndOfBuffer { position: usize, requested: usize },
    /// A variable-length integer continued past its maximum width.
    #[error("Variable-length integer at bit {position} is too long.")]
    VarIntTooLong { position: usize },
}

/// A read position over a fixed byte buffer, at bit granularity.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitCursor<'a> {
    /// Place a cursor at the first bit of a buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current position, in bits from the start of the buffer.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of unread bits.
    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.position
    }

    /// Read `n` bits as an unsigned integer, the first bit read being the
    /// least significant.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`MAX_WIDTH`].
    pub fn read_bits(&mut self, n: u32) -> Result<u32, Error> {
        assert!(n <= MAX_WIDTH, "cannot read {n} bits at once");

        self.require(n as usize)?;

        let mut value = 0;
        let mut read = 0;

        while read < n {
            let byte = u32::from(self.data[self.position / 8]);
            let offset = (self.position % 8) as u32;
            let width = (8 - offset).min(n - read);

            value |= ((byte >> offset) & ((1 << width) - 1)) << read;

            self.position += width as usize;
            read += width;
        }

        Ok(value)
    }

    /// Read a sub-message tag.
    ///
    /// A 6-bit base is read first. Its bits 4 and 5 select how many extension
    /// bits follow (none, 4, 8 or 28); the extension is placed above the low
    /// four bits of the base.
    pub fn read_tag(&mut self) -> Result<u32, Error> {
        self.atomic(|c| {
            let base = c.read_bits(6)?;

            let width = match base & 0b11_0000 {
                0b01_0000 => 4,
                0b10_0000 => 8,
                0b11_0000 => 28,
                _ => return Ok(base),
            };

            let ext = c.read_bits(width)?;

            Ok((base & 0xF) | (ext << 4))
        })
    }

    /// Read a base-128 variable-length integer, eight bits per group.
    pub fn read_varint(&mut self) -> Result<u32, Error> {
        self.atomic(|c| {
            let position = c.position;
            let mut state = VarInt::new();

            loop {
                let byte = c.read_bits(8)? as u8;

                state = match state.advance([byte]) {
                    Ok(Left(state)) => state,
                    Ok(Right(value)) => return Ok(value),
                    Err(VarIntTooLong) => Err(Error::VarIntTooLong { position })?,
                };
            }
        })
    }

    /// Read `n` whole bytes.
    ///
    /// Borrows from the buffer when the cursor sits on a byte boundary, and
    /// copies otherwise.
    pub fn read_bytes(&mut self, n: usize) -> Result<Cow<'a, [u8]>, Error> {
        self.require(n.saturating_mul(8))?;

        if self.position % 8 == 0 {
            let start = self.position / 8;
            self.position += n * 8;
            return Ok(Cow::Borrowed(&self.data[start..start + n]));
        }

        let mut bytes = Vec::with_capacity(n);
        for _ in 0..n {
            bytes.push(self.read_bits(8)? as u8);
        }

        Ok(Cow::Owned(bytes))
    }

    fn require(&self, bits: usize) -> Result<(), Error> {
        if bits > self.remaining() {
            Err(Error::EndOfBuffer {
                position: self.position,
                requested: bits,
            })?;
        }

        Ok(())
    }

    /// Run a compound read, restoring the position if it fails.
    fn atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        let start = self.position;
        let result = f(self);

        if result.is_err() {
            self.position = start;
        }

        result
    }
}
