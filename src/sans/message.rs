//! Sub-messages embedded in packet frames.

use alloc::borrow::Cow;
use core::iter::FusedIterator;

use super::cursor::{BitCursor, Error};

/// Tag of the post-match details sub-message.
pub const POST_MATCH_DETAILS: u32 = 316;

/// Known sub-message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    PostMatchDetails,
    /// A tag this decoder does not route.
    Other(u32),
}

impl From<u32> for MessageKind {
    fn from(tag: u32) -> Self {
        match tag {
            POST_MATCH_DETAILS => Self::PostMatchDetails,
            tag => Self::Other(tag),
        }
    }
}

/// A complete `(tag, length, payload)` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubMessage<'a> {
    pub tag: u32,
    pub payload: Cow<'a, [u8]>,
}

impl SubMessage<'_> {
    /// The kind named by this record's tag.
    pub fn kind(&self) -> MessageKind {
        MessageKind::from(self.tag)
    }

    /// Payload length, as encoded.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Iterator over the sub-messages of an embedded packet payload.
///
/// Running out of bits anywhere in a record ends iteration without error, so
/// trailing padding and a truncated final record are both treated as the end
/// of the stream. An overlong length field is reported once, after which the
/// iterator is exhausted.
#[derive(Debug, Clone)]
pub struct SubMessages<'a> {
    cursor: BitCursor<'a>,
    done: bool,
}

impl<'a> SubMessages<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: BitCursor::new(data),
            done: false,
        }
    }

    /// Decode the next record, or `None` at the end of the stream.
    pub fn next_record(&mut self) -> Result<Option<SubMessage<'a>>, Error> {
        if self.done {
            return Ok(None);
        }

        match self.read() {
            Ok(message) => Ok(Some(message)),
            Err(Error::EndOfBuffer { .. }) => {
                self.done = true;
                Ok(None)
            }
            Err(err) => {
                self.done = true;
                Err(err)
            }
        }
    }

    fn read(&mut self) -> Result<SubMessage<'a>, Error> {
        let tag = self.cursor.read_tag()?;
        let length = self.cursor.read_varint()?;
        let payload = self.cursor.read_bytes(length as usize)?;

        Ok(SubMessage { tag, payload })
    }
}

impl<'a> Iterator for SubMessages<'a> {
    type Item = Result<SubMessage<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl FusedIterator for SubMessages<'_> {}
