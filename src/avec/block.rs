//! Block decompression of frame payloads.

use std::vec::Vec;

use thiserror::Error;

/// Most bytes a Snappy block can produce per compressed byte, rounded up.
const MAX_EXPANSION: usize = 22;

/// A compressed payload could not be decompressed.
#[derive(Debug, Error)]
pub enum CorruptBlock {
    #[error("Corrupt compressed block: {0}")]
    Snappy(#[from] snap::Error),
    /// The declared length is more than the block could expand to.
    #[error("Compressed block of {found} bytes declares {declared} decompressed bytes.")]
    Expansion { declared: usize, found: usize },
}

/// Decompress a raw Snappy block into `out`, replacing its contents.
///
/// `out` keeps its allocation between calls. The declared length is checked
/// against the block size before anything is allocated.
pub fn decompress(r: &[u8], out: &mut Vec<u8>) -> Result<(), CorruptBlock> {
    let len = snap::raw::decompress_len(r)?;

    if len > r.len().saturating_mul(MAX_EXPANSION) {
        Err(CorruptBlock::Expansion {
            declared: len,
            found: r.len(),
        })?;
    }

    out.clear();
    out.resize(len, 0);

    let written = snap::raw::Decoder::new().decompress(r, out)?;
    out.truncate(written);

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::vec;

    use super::*;

    #[test]
    fn round_trip() {
        let data = b"packet packet packet packet packet".repeat(8);
        let compressed = snap::raw::Encoder::new().compress_vec(&data).unwrap();

        let mut out = vec![0xEE; 3];
        decompress(&compressed, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn highly_repetitive_round_trip() {
        let data = vec![0; 1 << 16];
        let compressed = snap::raw::Encoder::new().compress_vec(&data).unwrap();

        let mut out = Vec::new();
        decompress(&compressed, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn corrupt() {
        let mut out = Vec::new();
        assert!(matches!(
            decompress(&[0x05, 0xFF, 0xFF], &mut out),
            Err(CorruptBlock::Snappy(_))
        ));
    }

    #[test]
    fn oversized_length_is_rejected_before_allocating() {
        // Declares 1 GiB from seven bytes.
        let block = [0x80, 0x80, 0x80, 0x80, 0x04, 0xFF, 0xFF];

        let mut out = Vec::new();
        assert!(matches!(
            decompress(&block, &mut out),
            Err(CorruptBlock::Expansion {
                declared: 0x4000_0000,
                found: 7
            })
        ));
        assert_eq!(out.capacity(), 0);
    }
}
