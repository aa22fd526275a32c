//! Protobuf schema collaborators.
//!
//! The frame and sub-message layers only carry opaque payloads. Interpreting
//! them requires a schema, supplied through the [`Schema`] trait. The default
//! [`ProtoSchema`] decodes the handful of messages the dispatcher needs.

use std::{string::String, vec::Vec};

use prost::Message;
use thiserror::Error;

use super::raw::{self, RawMessage};

/// A payload could not be interpreted against its schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Malformed protobuf message: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Malformed match metadata: {0}")]
    Metadata(#[from] raw::Error),
}

/// The file header carried by the first frame of a demo.
#[derive(Clone, PartialEq, Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileHeader {
    #[prost(string, optional, tag = "1")]
    pub demo_file_stamp: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub network_protocol: Option<i32>,
    #[prost(string, optional, tag = "3")]
    pub server_name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub client_name: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub map_name: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub game_directory: Option<String>,
    #[prost(int32, optional, tag = "7")]
    pub fullpackets_version: Option<i32>,
    #[prost(bool, optional, tag = "8")]
    pub allow_clientside_entities: Option<bool>,
    #[prost(bool, optional, tag = "9")]
    pub allow_clientside_particles: Option<bool>,
    #[prost(string, optional, tag = "10")]
    pub addons: Option<String>,
    #[prost(string, optional, tag = "11")]
    pub demo_version_name: Option<String>,
    #[prost(string, optional, tag = "12")]
    pub demo_version_guid: Option<String>,
    #[prost(int32, optional, tag = "13")]
    pub build_num: Option<i32>,
    #[prost(string, optional, tag = "14")]
    pub game: Option<String>,
    #[prost(int32, optional, tag = "15")]
    pub server_start_tick: Option<i32>,
}

impl FileHeader {
    /// Identifier naming artifacts derived from this demo.
    ///
    /// The version GUID when present and non-empty, the file stamp otherwise.
    pub fn id(&self) -> Option<&str> {
        [&self.demo_version_guid, &self.demo_file_stamp]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.is_empty())
    }
}

/// Packet and signon packet frames.
#[derive(Clone, PartialEq, Message)]
pub struct Packet {
    /// The embedded sub-message bitstream.
    #[prost(bytes = "vec", optional, tag = "3")]
    pub data: Option<Vec<u8>>,
}

/// The post-match details user message.
#[derive(Clone, PartialEq, Message)]
pub struct PostMatchDetails {
    /// Serialized match metadata.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub match_details: Option<Vec<u8>>,
}

/// Decoded post-match details.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PostMatch {
    /// Match metadata, decoded without its schema.
    pub match_details: RawMessage,
}

/// Interpret payloads forwarded by the dispatcher.
pub trait Schema {
    /// Decode the payload of a file header frame.
    fn decode_header(&self, r: &[u8]) -> Result<FileHeader, SchemaError>;
    /// Extract the embedded sub-message bitstream from a packet frame.
    fn extract_packet(&self, r: &[u8]) -> Result<Vec<u8>, SchemaError>;
    /// Decode the payload of a post-match details sub-message.
    fn decode_post_match(&self, r: &[u8]) -> Result<PostMatch, SchemaError>;
}

/// Schema collaborators backed by `prost`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtoSchema;

impl Schema for ProtoSchema {
    fn decode_header(&self, r: &[u8]) -> Result<FileHeader, SchemaError> {
        Ok(FileHeader::decode(r)?)
    }

    fn extract_packet(&self, r: &[u8]) -> Result<Vec<u8>, SchemaError> {
        Ok(Packet::decode(r)?.data.unwrap_or_default())
    }

    fn decode_post_match(&self, r: &[u8]) -> Result<PostMatch, SchemaError> {
        let details = PostMatchDetails::decode(r)?;
        let match_details = RawMessage::decode(details.match_details.as_deref().unwrap_or_default())?;

        Ok(PostMatch { match_details })
    }
}
