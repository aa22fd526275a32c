//! Reader-based decoder implementation.
//!
//! _Requires Cargo feature `std`._

use std::{
    io::{ErrorKind, Read},
    mem,
    vec::Vec,
};

use either::Either::{Left, Right};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::sans::{
    Decoder,
    frame::{Frame, FrameField},
    header::{FrameHeader, HEADER_SIZE},
};

use super::{
    FromDemo,
    block::{self, CorruptBlock},
    dispatch::{self, Dispatcher, Summary},
    schema::Schema,
};

/// Errors occurring while decoding from a reader.
///
/// Offsets are in bytes from the start of the demo.
#[derive(Debug, Error)]
pub enum Error {
    /// An error from the supplied reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The reader ended partway through a header field.
    #[error("Reached the end of the demo reading the {field} at offset {offset}.")]
    TruncatedHeader { field: FrameField, offset: u64 },
    /// The reader ended before a frame's declared payload size.
    #[error("Frame payload at offset {offset} declares {expected} bytes, but only {found} remain.")]
    TruncatedPayload {
        expected: usize,
        found: usize,
        offset: u64,
    },
    /// A frame header field continued past its maximum width.
    #[error("The {field} at offset {offset} is too long.")]
    VarIntTooLong { field: FrameField, offset: u64 },
    /// A compressed payload could not be decompressed.
    #[error("Frame payload at offset {offset}: {source}")]
    CorruptBlock { offset: u64, source: CorruptBlock },
    /// A previous call failed, so the stream cannot continue.
    #[error("The demo stream failed earlier and cannot continue.")]
    Failed,
    /// A fatal routing error.
    #[error(transparent)]
    Dispatch(#[from] dispatch::Error),
}

/// Frames of a demo, read from a reader.
///
/// One payload buffer and one decompression buffer are reused across frames.
/// Each frame borrows the stream, so it must be consumed before the next is
/// read. Once the stream has ended, every call returns `None`. Once it has
/// failed, every call returns [`Error::Failed`].
#[derive(Debug)]
pub struct FrameStream<R> {
    r: R,
    offset: u64,
    state: State,
    buffer: Vec<u8>,
    scratch: Vec<u8>,
}

#[derive(Debug)]
enum State {
    Frame(FrameHeader),
    Ended,
    Failed,
}

impl<R: Read> FrameStream<R> {
    /// Skip the container header of a demo.
    pub fn new(mut r: R) -> Result<Self, Error> {
        let mut header = [0; HEADER_SIZE];

        r.read_exact(&mut header).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => Error::TruncatedHeader {
                field: FrameField::DemoHeader,
                offset: 0,
            },
            _ => err.into(),
        })?;

        let (stamp, state) = Decoder::advance(header);
        debug!(stamp = %stamp.escape_ascii(), "demo header");

        Ok(Self {
            r,
            offset: HEADER_SIZE as u64,
            state: State::Frame(state),
            buffer: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Bytes consumed from the reader so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next frame, decompressing its payload if flagged.
    ///
    /// Returns `None` when the reader ends exactly at a frame boundary.
    pub fn next_frame(&mut self) -> Result<Option<Frame<'_>>, Error> {
        // Any early return below leaves the stream failed.
        let mut state = match mem::replace(&mut self.state, State::Failed) {
            State::Frame(state) => state,
            State::Ended => {
                self.state = State::Ended;
                return Ok(None);
            }
            State::Failed => Err(Error::Failed)?,
        };

        let payload = loop {
            let field = state.field();
            let offset = self.offset;
            let mut byte = [0];

            match self.r.read_exact(&mut byte) {
                Ok(()) => self.offset += 1,
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                    if state.at_boundary() {
                        debug!(offset, "end of demo");
                        self.state = State::Ended;
                        return Ok(None);
                    }

                    Err(Error::TruncatedHeader { field, offset })?
                }
                Err(err) => Err(err)?,
            }

            state = match state.advance(byte) {
                Ok(Left(state)) => state,
                Ok(Right(payload)) => break payload,
                Err(_) => Err(Error::VarIntTooLong { field, offset })?,
            };
        };

        let offset = self.offset;
        let expected = payload.size();

        self.buffer.clear();
        let found = (&mut self.r)
            .take(expected as u64)
            .read_to_end(&mut self.buffer)?;

        if found < expected {
            Err(Error::TruncatedPayload {
                expected,
                found,
                offset,
            })?;
        }

        self.offset += found as u64;

        let (info, state) = payload.advance();
        trace!(?info, offset, "frame");

        if info.is_compressed {
            block::decompress(&self.buffer, &mut self.scratch)
                .map_err(|source| Error::CorruptBlock { offset, source })?;
        }

        self.state = State::Frame(state);

        let payload = if info.is_compressed {
            &self.scratch
        } else {
            &self.buffer
        };

        Ok(Some(Frame { info, payload }))
    }
}

/// Decode a demo from a reader, publishing to a receiver.
///
/// This method is also re-exported as `vdem::avec::decode_reader`.
///
/// _Requires Cargo feature `std`._
pub fn decode<S: Schema + ?Sized>(
    r: impl Read,
    schema: &S,
    o: &mut (impl FromDemo + ?Sized),
) -> Result<Summary, Error> {
    let mut frames = FrameStream::new(r)?;
    let mut dispatcher = Dispatcher::new(schema);

    while let Some(frame) = frames.next_frame()? {
        dispatcher.dispatch(frame, o)?;
    }

    let summary = dispatcher.finish();
    info!(
        frames = summary.frames,
        packets = summary.packets,
        skipped_packets = summary.skipped_packets,
        post_matches = summary.post_matches,
        bytes = frames.offset(),
        "decoded demo"
    );

    Ok(summary)
}
