//! Frame commands, kinds and summaries.

use core::fmt;

use tartan_bitfield::bitfield;

/// Command bit flagging a block-compressed payload.
pub const COMPRESSION_BIT: u32 = 0x40;

/// Tick value stored for frames recorded before the first tick.
pub const TICK_SENTINEL: u32 = u32::MAX;

/// Known frame kinds, keyed by message type (the command without its
/// compression bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FrameKind {
    Stop,
    FileHeader,
    FileInfo,
    SyncTick,
    SendTables,
    ClassInfo,
    StringTables,
    Packet,
    SignonPacket,
    ConsoleCmd,
    CustomData,
    CustomDataCallbacks,
    UserCmd,
    FullPacket,
    SaveGame,
    SpawnGroups,
    AnimationData,
    AnimationHeader,
    /// A message type this decoder has no name for.
    Unknown(u32),
}

impl FrameKind {
    /// The message type identifying this kind.
    pub fn id(self) -> u32 {
        match self {
            Self::Stop => 0,
            Self::FileHeader => 1,
            Self::FileInfo => 2,
            Self::SyncTick => 3,
            Self::SendTables => 4,
            Self::ClassInfo => 5,
            Self::StringTables => 6,
            Self::Packet => 7,
            Self::SignonPacket => 8,
            Self::ConsoleCmd => 9,
            Self::CustomData => 10,
            Self::CustomDataCallbacks => 11,
            Self::UserCmd => 12,
            Self::FullPacket => 13,
            Self::SaveGame => 14,
            Self::SpawnGroups => 15,
            Self::AnimationData => 16,
            Self::AnimationHeader => 17,
            Self::Unknown(id) => id,
        }
    }

    /// Whether frames of this kind embed a bit-packed sub-message stream.
    pub fn is_packet(self) -> bool {
        matches!(self, Self::Packet | Self::SignonPacket)
    }
}

impl From<u32> for FrameKind {
    fn from(id: u32) -> Self {
        match id {
            0 => Self::Stop,
            1 => Self::FileHeader,
            2 => Self::FileInfo,
            3 => Self::SyncTick,
            4 => Self::SendTables,
            5 => Self::ClassInfo,
            6 => Self::StringTables,
            7 => Self::Packet,
            8 => Self::SignonPacket,
            9 => Self::ConsoleCmd,
            10 => Self::CustomData,
            11 => Self::CustomDataCallbacks,
            12 => Self::UserCmd,
            13 => Self::FullPacket,
            14 => Self::SaveGame,
            15 => Self::SpawnGroups,
            16 => Self::AnimationData,
            17 => Self::AnimationHeader,
            id => Self::Unknown(id),
        }
    }
}

/// Summary of a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FrameInfo {
    /// Raw command, compression bit included.
    pub command: u32,
    /// Command with the compression bit cleared.
    pub message_type: u32,
    /// Whether the payload is block-compressed.
    pub is_compressed: bool,
    /// Tick, with [`TICK_SENTINEL`] normalized to zero.
    pub tick: u32,
    /// Payload size as stored, before any decompression.
    pub size: u32,
}

impl FrameInfo {
    /// Interpret the three varint fields of a frame header.
    pub fn new(command: u32, tick: u32, size: u32) -> Self {
        bitfield! {
            struct Command(u32) {
                [6] is_compressed,
            }
        }

        let is_compressed = Command(command).is_compressed();

        Self {
            command,
            message_type: command & !COMPRESSION_BIT,
            is_compressed,
            tick: if tick == TICK_SENTINEL { 0 } else { tick },
            size,
        }
    }

    /// The kind named by this frame's message type.
    pub fn kind(&self) -> FrameKind {
        FrameKind::from(self.message_type)
    }
}

/// A frame header with its (decompressed) payload.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub info: FrameInfo,
    pub payload: &'a [u8],
}

/// Fields of the container, for locating truncation and format errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    DemoHeader,
    Command,
    Tick,
    Size,
    Payload,
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DemoHeader => "demo header",
            Self::Command => "frame command",
            Self::Tick => "frame tick",
            Self::Size => "frame size",
            Self::Payload => "frame payload",
        })
    }
}
