//! I/O-free decoding core.
//!
//! Nothing in this module performs I/O or allocates beyond what a single
//! read requires. Two layers are exposed:
//!
//! - The outer frame layer, as a chain of state tokens. Starting from
//!   [`Decoder`], feed the 16 container header bytes, then feed frame header
//!   bytes one at a time until a [`header::FramePayload`] token is returned.
//!   That token reports how many payload bytes the caller must supply before
//!   the next frame header begins.
//!
//! - The inner sub-message layer, as a [`cursor::BitCursor`] and the
//!   [`message::SubMessages`] iterator built on it.
//!
//! Some areas of decoding are not represented here and must be handled by the
//! caller:
//!
//! - Reading bytes from the correct place in the document, including buffering
//!   and ending cleanly when the source runs out at a frame boundary.
//!
//! - Decompressing payloads whose frame command carries the compression flag.
//!
//! - Extracting the embedded bit-payload from a packet frame, which requires
//!   the frame's protobuf schema.
//!
//! See [`crate::avec`] for an implementation covering all of these.

pub mod cursor;
pub mod frame;
pub mod header;
pub mod message;
pub mod varint;

/// Entrypoint to the frame state tokens.
pub type Decoder = header::DemoHeader;
