//! States processing the container header and frame headers.

use either::Either::{self, Left, Right};
use zerocopy::FromBytes;

use super::{
    frame::{FrameField, FrameInfo},
    varint::{VarInt, VarIntTooLong},
};

/// Size of the container header preceding the first frame.
pub const HEADER_SIZE: usize = 16;

/// State token to skip the container header.
#[derive(Debug)]
pub struct DemoHeader;

impl DemoHeader {
    /// Transition to another state by skipping the container header.
    ///
    /// The header is not interpreted. Returns its leading eight bytes (the
    /// file stamp, for diagnostics only), and a successor state token.
    pub fn advance(r: [u8; HEADER_SIZE]) -> ([u8; 8], FrameHeader) {
        #[repr(C, packed)]
        #[derive(FromBytes)]
        struct ContainerHeader {
            stamp: [u8; 8],
            _file_info_offset: [u8; 4],
            _spawn_groups_offset: [u8; 4],
        }

        let ContainerHeader { stamp, .. } = zerocopy::transmute!(r);

        (stamp, FrameHeader::new())
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Command,
    Tick { command: u32 },
    Size { command: u32, tick: u32 },
}

/// State token to decode a frame header, one byte at a time.
#[derive(Debug)]
pub struct FrameHeader {
    step: Step,
    varint: VarInt,
}

impl FrameHeader {
    pub(super) fn new() -> Self {
        Self {
            step: Step::Command,
            varint: VarInt::new(),
        }
    }

    /// The header field the next byte belongs to.
    pub fn field(&self) -> FrameField {
        match self.step {
            Step::Command => FrameField::Command,
            Step::Tick { .. } => FrameField::Tick,
            Step::Size { .. } => FrameField::Size,
        }
    }

    /// Whether no byte of this frame has been consumed yet.
    ///
    /// A source running out in this state has ended cleanly.
    pub fn at_boundary(&self) -> bool {
        matches!(self.step, Step::Command) && self.varint.is_empty()
    }

    /// Transition to another state by decoding a frame header byte.
    ///
    /// Returns a successor state token, which is a [`FramePayload`] once the
    /// command, tick and size fields are complete.
    pub fn advance(self, r: [u8; 1]) -> Result<Either<FrameHeader, FramePayload>, VarIntTooLong> {
        let value = match self.varint.advance(r)? {
            Left(varint) => return Ok(Left(Self { varint, ..self })),
            Right(value) => value,
        };

        let step = match self.step {
            Step::Command => Step::Tick { command: value },
            Step::Tick { command } => Step::Size {
                command,
                tick: value,
            },
            Step::Size { command, tick } => {
                let info = FrameInfo::new(command, tick, value);
                return Ok(Right(FramePayload { info }));
            }
        };

        Ok(Left(Self {
            step,
            varint: VarInt::new(),
        }))
    }
}

/// State token to consume a frame payload.
#[derive(Debug)]
pub struct FramePayload {
    info: FrameInfo,
}

impl FramePayload {
    /// Summary of the frame header just decoded.
    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    /// Number of payload bytes the caller must consume.
    pub fn size(&self) -> usize {
        self.info.size as usize
    }

    /// Transition to another state once the payload bytes are consumed.
    ///
    /// Returns the frame summary, and a successor state token.
    pub fn advance(self) -> (FrameInfo, FrameHeader) {
        (self.info, FrameHeader::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(mut state: FrameHeader, bytes: &[u8]) -> Either<FrameHeader, FramePayload> {
        for (i, &b) in bytes.iter().enumerate() {
            match state.advance([b]).unwrap() {
                Left(next) => state = next,
                Right(payload) => {
                    assert_eq!(i, bytes.len() - 1, "payload reached early");
                    return Right(payload);
                }
            }
        }
        Left(state)
    }

    #[test]
    fn header_stamp() {
        let mut r = [0; HEADER_SIZE];
        r[..8].copy_from_slice(b"PBDEMS2\0");
        let (stamp, state) = DemoHeader::advance(r);
        assert_eq!(&stamp, b"PBDEMS2\0");
        assert!(state.at_boundary());
    }

    #[test]
    fn frame_fields() {
        let (_, state) = DemoHeader::advance([0; HEADER_SIZE]);

        // Command 0x47, tick 0xFFFFFFFF, size 300.
        let bytes = [0x47, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0xAC, 0x02];
        let Right(payload) = feed(state, &bytes) else {
            panic!("frame header incomplete");
        };

        assert_eq!(payload.size(), 300);
        let (info, next) = payload.advance();
        assert_eq!(info.command, 0x47);
        assert_eq!(info.message_type, 7);
        assert!(info.is_compressed);
        assert_eq!(info.tick, 0);
        assert!(next.at_boundary());
    }

    #[test]
    fn partial_fields() {
        let (_, state) = DemoHeader::advance([0; HEADER_SIZE]);
        assert_eq!(state.field(), FrameField::Command);

        let Left(state) = feed(state, &[0x81]) else {
            panic!()
        };
        assert_eq!(state.field(), FrameField::Command);
        assert!(!state.at_boundary());

        let Left(state) = feed(state, &[0x00, 0x05]) else {
            panic!()
        };
        assert_eq!(state.field(), FrameField::Size);
    }

    #[test]
    fn overlong_field() {
        let (_, mut state) = DemoHeader::advance([0; HEADER_SIZE]);
        for _ in 0..4 {
            state = state.advance([0x80]).unwrap().unwrap_left();
        }
        assert!(matches!(state.advance([0x80]), Err(VarIntTooLong)));
    }
}
