//! Rendering of decoded demo parts as summary lines and match data files.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use tracing::info;
use vdem::{
    avec::{
        FromDemo,
        schema::{FileHeader, PostMatch},
    },
    sans::{frame::FrameInfo, message::SubMessage},
};

/// Format of summary lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Line<'a> {
    Frame(&'a FrameInfo),
    Header(&'a FileHeader),
    Message { tag: u32, size: usize },
}

/// Receiver writing summary lines to an optional sink, and post-match
/// details to `match_data_<id>.json` files.
///
/// Write errors cannot interrupt decoding, so the first one is kept and
/// returned by [`Renderer::finish`]. Nothing is written after it.
pub struct Renderer<W> {
    out: Option<W>,
    format: Format,
    quick: bool,
    json_dir: PathBuf,
    error: Option<anyhow::Error>,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: Option<W>, format: Format, quick: bool, json_dir: impl Into<PathBuf>) -> Self {
        Self {
            out,
            format,
            quick,
            json_dir: json_dir.into(),
            error: None,
        }
    }

    /// Flush the summary sink, returning it, or the first error raised.
    pub fn finish(mut self) -> Result<Option<W>> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        if let Some(out) = &mut self.out {
            out.flush().context("flushing summary output")?;
        }

        Ok(self.out)
    }

    fn record(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) {
        if self.error.is_none() {
            if let Err(err) = f(self) {
                self.error = Some(err);
            }
        }
    }

    fn write_line(&mut self, text: impl FnOnce() -> String, line: Line<'_>) -> Result<()> {
        let Some(out) = &mut self.out else {
            return Ok(());
        };

        match self.format {
            Format::Text => out.write_all(text().as_bytes())?,
            Format::Json => {
                serde_json::to_writer(&mut *out, &line)?;
                out.write_all(b"\n")?;
            }
        }

        Ok(())
    }

    fn write_match_data(&self, demo_id: Option<&str>, details: &PostMatch) -> Result<PathBuf> {
        let path = self.json_dir.join(match_data_file_name(demo_id));

        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut w = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut w, &details.match_details)?;
        w.flush()?;

        Ok(path)
    }
}

/// Name of the match data file for a demo.
///
/// The identifier comes from the demo itself, so anything but ASCII
/// alphanumerics, `-` and `_` is replaced and the name cannot leave its
/// directory.
fn match_data_file_name(demo_id: Option<&str>) -> String {
    let id: String = demo_id
        .filter(|id| !id.is_empty())
        .unwrap_or("unknown")
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();

    format!("match_data_{id}.json")
}

impl<W: Write> FromDemo for Renderer<W> {
    fn add_frame(&mut self, frame: &FrameInfo) {
        self.record(|r| {
            let text = || {
                format!(
                    "Command Number: {} (msgType: {}), Tick Number: {}, Frame Size: {}, Compressed: {}\n",
                    frame.command, frame.message_type, frame.tick, frame.size, frame.is_compressed
                )
            };

            r.write_line(text, Line::Frame(frame))
                .context("writing frame summary")
        });
    }

    fn add_header(&mut self, header: &FileHeader) {
        self.record(|r| {
            let text = || {
                format!(
                    "DemoGuid: {}\nNetworkProtocol: {}\nServerName: {}\nClientName: {}\nMapName: {}\n",
                    header.demo_version_guid.as_deref().unwrap_or_default(),
                    header.network_protocol.unwrap_or_default(),
                    header.server_name.as_deref().unwrap_or_default(),
                    header.client_name.as_deref().unwrap_or_default(),
                    header.map_name.as_deref().unwrap_or_default(),
                )
            };

            r.write_line(text, Line::Header(header))
                .context("writing file header")
        });
    }

    fn add_message(&mut self, message: &SubMessage<'_>) {
        if self.quick {
            return;
        }

        self.record(|r| {
            let (tag, size) = (message.tag, message.len());
            let text = || format!("Ubit: {tag}, MsgSize: {size}\n");

            r.write_line(text, Line::Message { tag, size })
                .context("writing sub-message summary")
        });
    }

    fn add_post_match(&mut self, demo_id: Option<&str>, details: PostMatch) {
        self.record(|r| {
            let path = r.write_match_data(demo_id, &details)?;
            info!(path = %path.display(), "match data written");
            Ok(())
        });
    }
}
