//! Convenience interfaces for decoding whole demos.
//!
//! _Requires Cargo feature `std`._
//!
//! [`decode_reader`] walks every frame of a demo from a reader, decompressing
//! payloads and routing them through a [`Dispatcher`](dispatch::Dispatcher),
//! which publishes to the [`FromDemo`] trait. In many cases this trait can be
//! derived. See the [`FromDemo`](macro@FromDemo) macro for details.

pub mod block;
pub mod dispatch;
pub mod raw;
pub mod reader;
pub mod schema;

pub use reader::decode as decode_reader;

use crate::sans::{frame::FrameInfo, message::SubMessage};

use schema::{FileHeader, PostMatch};

/// Derive [`FromDemo`] for a struct collecting parts of a demo.
///
/// _Requires Cargo feature `derive`._
///
/// # Example
///
/// To collect the payloads of every sub-message with a given tag, add the
/// `message(N)` attribute to a `Vec<Vec<u8>>` struct field, where `N` is the
/// tag. To keep only the latest payload, use an `Option<Vec<u8>>` instead.
/// Frame summaries are collected into a `Vec<FrameInfo>` marked `frame`, and
/// the latest file header into an `Option<FileHeader>` marked `header`.
///
/// ```
/// #[derive(Debug, Default, FromDemo)]
/// struct Extract {
///     #[header]
///     header: Option<FileHeader>,
///     #[frame]
///     frames: Vec<FrameInfo>,
///     #[message(316)]
///     post_match: Option<Vec<u8>>,
/// }
/// ```
///
/// To accumulate payloads any other way, supply a closure. Its second
/// parameter must be typed as `&[u8]`.
///
/// ```
/// #[derive(Debug, Default, FromDemo)]
/// struct Sizes {
///     #[message(4, |total, payload: &[u8]| *total += payload.len())]
///     tick_bytes: usize,
/// }
/// ```
#[cfg(feature = "derive")]
pub use vdem_derive::FromDemo;

/// Receive the parts of a demo, in stream order.
///
/// The default implementation of each method ignores received values.
///
/// See the [`FromDemo`](macro@FromDemo) derive macro for an automatic
/// implementation of this trait.
#[allow(unused_variables)]
pub trait FromDemo {
    /// Add the summary of an outer frame, before its payload is routed.
    fn add_frame(&mut self, frame: &FrameInfo) {}
    /// Add a decoded file header.
    fn add_header(&mut self, header: &FileHeader) {}
    /// Add a complete sub-message of a packet frame, before it is routed.
    fn add_message(&mut self, message: &SubMessage<'_>) {}
    /// Add decoded post-match details.
    ///
    /// `demo_id` identifies the demo by its most recent file header, if one
    /// has been seen.
    fn add_post_match(&mut self, demo_id: Option<&str>, details: PostMatch) {}
}
