#![no_std]

//! A bit-level decoder for Source 2 recorded-game ("demo") containers.
//!
//! A demo is a 16-byte container header followed by a sequence of frames,
//! each a `(command, tick, size, payload)` record with variable-length
//! integer fields. Packet frames embed a bit-packed stream of sub-messages,
//! each a `(tag, length, payload)` record read at bit granularity.
//!
//! Most users should begin with [`avec::decode_reader`] and the
//! [`FromDemo`](avec::FromDemo) receiver trait (or its derive macro). The
//! [`sans`] module exposes the I/O-free core: the bit cursor, the frame
//! header state tokens and the sub-message iterator.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `derive`: enable derive macros (default).
//! - `std`: enable reader-based decoding, block decompression and the
//!   protobuf schema collaborators (default).
//! - `serde`: implement `Serialize` for frame summaries, file headers and
//!   raw protobuf messages.

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
pub mod avec;
pub mod sans;
