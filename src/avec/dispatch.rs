//! Routing of frames and sub-messages to schema collaborators.

use std::string::String;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::sans::{
    frame::{Frame, FrameKind},
    message::{MessageKind, SubMessages},
};

use super::{
    FromDemo,
    schema::{Schema, SchemaError},
};

/// Fatal errors raised while routing a frame.
#[derive(Debug, Error)]
pub enum Error {
    /// The file header could not be decoded, so the input is not a demo.
    #[error("Incorrect file header: {0}")]
    Header(#[source] SchemaError),
    /// Post-match details could not be decoded.
    #[error("Malformed post-match details at tick {tick}: {source}")]
    PostMatch { tick: u32, source: SchemaError },
}

/// Counters describing one decoding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Frames routed.
    pub frames: usize,
    /// Packet frames whose sub-messages were walked.
    pub packets: usize,
    /// Packet frames skipped because their payload was malformed.
    pub skipped_packets: usize,
    /// Complete sub-messages found in packet frames.
    pub messages: usize,
    /// Post-match details decoded.
    pub post_matches: usize,
    /// Identifier of the last file header seen.
    pub demo_id: Option<String>,
}

/// Route frames by kind, and the sub-messages of packet frames by tag.
///
/// The identifier of the latest file header is held here, for the lifetime
/// of one run, and passed along with post-match details.
#[derive(Debug)]
pub struct Dispatcher<'s, S: Schema + ?Sized> {
    schema: &'s S,
    demo_id: Option<String>,
    summary: Summary,
}

impl<'s, S: Schema + ?Sized> Dispatcher<'s, S> {
    pub fn new(schema: &'s S) -> Self {
        Self {
            schema,
            demo_id: None,
            summary: Summary::default(),
        }
    }

    /// Identifier of the latest file header, if one has been seen.
    pub fn demo_id(&self) -> Option<&str> {
        self.demo_id.as_deref()
    }

    /// Route a frame, publishing to a receiver.
    ///
    /// Only a malformed file header or malformed post-match details are
    /// fatal. A packet whose payload cannot be extracted is skipped, and one
    /// whose sub-message stream is malformed ends early.
    pub fn dispatch(
        &mut self,
        frame: Frame<'_>,
        o: &mut (impl FromDemo + ?Sized),
    ) -> Result<(), Error> {
        let info = &frame.info;
        self.summary.frames += 1;
        o.add_frame(info);

        match info.kind() {
            FrameKind::FileHeader => {
                let header = self.schema.decode_header(frame.payload).map_err(Error::Header)?;

                self.demo_id = header.id().map(Into::into);
                debug!(demo_id = ?self.demo_id, map = ?header.map_name, "file header");

                o.add_header(&header);
            }
            FrameKind::Packet | FrameKind::SignonPacket => self.dispatch_packet(frame, o)?,
            FrameKind::Unknown(id) => debug!(id, tick = info.tick, "unknown frame kind"),
            FrameKind::Stop
            | FrameKind::FileInfo
            | FrameKind::SyncTick
            | FrameKind::SendTables
            | FrameKind::ClassInfo
            | FrameKind::StringTables
            | FrameKind::ConsoleCmd
            | FrameKind::CustomData
            | FrameKind::CustomDataCallbacks
            | FrameKind::UserCmd
            | FrameKind::FullPacket
            | FrameKind::SaveGame
            | FrameKind::SpawnGroups
            | FrameKind::AnimationData
            | FrameKind::AnimationHeader => {
                trace!(kind = ?info.kind(), tick = info.tick, "not routed");
            }
        }

        Ok(())
    }

    fn dispatch_packet(
        &mut self,
        frame: Frame<'_>,
        o: &mut (impl FromDemo + ?Sized),
    ) -> Result<(), Error> {
        let tick = frame.info.tick;

        let data = match self.schema.extract_packet(frame.payload) {
            Ok(data) => data,
            Err(err) => {
                warn!(tick, %err, "skipping malformed packet");
                self.summary.skipped_packets += 1;
                return Ok(());
            }
        };

        self.summary.packets += 1;

        for message in SubMessages::new(&data) {
            let message = match message {
                Ok(message) => message,
                Err(err) => {
                    debug!(tick, %err, "ending malformed packet");
                    break;
                }
            };

            self.summary.messages += 1;
            o.add_message(&message);

            match message.kind() {
                MessageKind::PostMatchDetails => {
                    let details = self
                        .schema
                        .decode_post_match(&message.payload)
                        .map_err(|source| Error::PostMatch { tick, source })?;

                    debug!(tick, demo_id = ?self.demo_id, "post-match details");
                    self.summary.post_matches += 1;

                    o.add_post_match(self.demo_id.as_deref(), details);
                }
                MessageKind::Other(_) => {}
            }
        }

        Ok(())
    }

    /// End the run, returning its counters.
    pub fn finish(self) -> Summary {
        Summary {
            demo_id: self.demo_id,
            ..self.summary
        }
    }
}
