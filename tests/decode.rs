#![cfg(feature = "std")]

mod common;

use std::cell::RefCell;

use common::{BitWriter, DemoBuilder};
use prost::Message;
use vdem::{
    avec::{
        FromDemo, dispatch,
        raw::RawValue,
        reader,
        schema::{
            FileHeader, Packet, PostMatch, PostMatchDetails, ProtoSchema, Schema, SchemaError,
        },
    },
    sans::{frame::FrameInfo, message::SubMessage},
};

/// Records every post-match payload handed to the schema.
#[derive(Default)]
struct Spy {
    post_matches: RefCell<Vec<Vec<u8>>>,
}

impl Schema for Spy {
    fn decode_header(&self, r: &[u8]) -> Result<FileHeader, SchemaError> {
        ProtoSchema.decode_header(r)
    }

    fn extract_packet(&self, r: &[u8]) -> Result<Vec<u8>, SchemaError> {
        ProtoSchema.extract_packet(r)
    }

    fn decode_post_match(&self, r: &[u8]) -> Result<PostMatch, SchemaError> {
        self.post_matches.borrow_mut().push(r.to_vec());
        ProtoSchema.decode_post_match(r)
    }
}

#[derive(Default)]
struct Collect {
    frames: Vec<FrameInfo>,
    tags: Vec<(u32, usize)>,
    post_matches: Vec<(Option<String>, PostMatch)>,
}

impl FromDemo for Collect {
    fn add_frame(&mut self, frame: &FrameInfo) {
        self.frames.push(*frame);
    }

    fn add_message(&mut self, message: &SubMessage<'_>) {
        self.tags.push((message.tag, message.len()));
    }

    fn add_post_match(&mut self, demo_id: Option<&str>, details: PostMatch) {
        self.post_matches.push((demo_id.map(String::from), details));
    }
}

fn header(guid: &str) -> Vec<u8> {
    FileHeader {
        demo_file_stamp: Some("PBDEMS2".into()),
        demo_version_guid: Some(guid.into()),
        map_name: Some("street_test".into()),
        ..Default::default()
    }
    .encode_to_vec()
}

fn packet(bits: &BitWriter) -> Vec<u8> {
    Packet {
        data: Some(bits.finish()),
    }
    .encode_to_vec()
}

/// Post-match details whose metadata is `{ 1: 42, 2: "key" }`.
fn post_match_details() -> Vec<u8> {
    PostMatchDetails {
        match_details: Some(vec![0x08, 0x2A, 0x12, 0x03, b'k', b'e', b'y']),
    }
    .encode_to_vec()
}

#[test]
fn post_match_is_named_by_header() {
    let details = post_match_details();
    let bits = BitWriter::new()
        .message(4, &[1, 2, 3])
        .message(316, &details)
        .bits(0, 3)
        .finish();

    let data = DemoBuilder::new()
        .frame(1, u32::MAX, &header("abc123"))
        .frame(
            7,
            0,
            &Packet {
                data: Some(bits),
            }
            .encode_to_vec(),
        )
        .frame(0, 100, &[])
        .build();

    let schema = Spy::default();
    let mut collect = Collect::default();
    let summary = vdem::avec::decode_reader(&data[..], &schema, &mut collect).unwrap();

    assert_eq!(*schema.post_matches.borrow(), [details.clone()]);
    assert_eq!(collect.tags, [(4, 3), (316, details.len())]);
    assert_eq!(collect.frames.len(), 3);
    assert_eq!(collect.frames[0].tick, 0);

    let [(demo_id, post_match)] = collect.post_matches.as_slice() else {
        panic!("expected exactly one post-match");
    };
    assert_eq!(demo_id.as_deref(), Some("abc123"));
    assert_eq!(
        post_match.match_details.get(1).next(),
        Some(&RawValue::Varint(42))
    );
    assert_eq!(
        post_match.match_details.get(2).next(),
        Some(&RawValue::Text("key".into()))
    );

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.packets, 1);
    assert_eq!(summary.messages, 2);
    assert_eq!(summary.post_matches, 1);
    assert_eq!(summary.demo_id.as_deref(), Some("abc123"));
}

#[test]
fn compressed_signon_packet() {
    let details = post_match_details();
    let payload = packet(BitWriter::new().message(316, &details));
    let compressed = snap::raw::Encoder::new().compress_vec(&payload).unwrap();

    let data = DemoBuilder::new()
        .frame(1, 0, &header("def456"))
        .frame(0x48, 2, &compressed)
        .build();

    let mut collect = Collect::default();
    vdem::avec::decode_reader(&data[..], &ProtoSchema, &mut collect).unwrap();

    assert_eq!(collect.post_matches.len(), 1);
    assert_eq!(collect.post_matches[0].0.as_deref(), Some("def456"));
}

#[test]
fn truncated_record_ends_packet_cleanly() {
    // The tag is complete, but the length's continuation group is missing.
    let mut bits = BitWriter::new();
    bits.message(4, &[9]).tag(316).bits(0x80, 8);

    let data = DemoBuilder::new()
        .frame(7, 0, &packet(&bits))
        .frame(3, 1, &[])
        .build();

    let mut collect = Collect::default();
    let summary = vdem::avec::decode_reader(&data[..], &ProtoSchema, &mut collect).unwrap();

    assert_eq!(collect.tags, [(4, 1)]);
    assert!(collect.post_matches.is_empty());
    assert_eq!(summary.frames, 2);
}

#[test]
fn malformed_packet_is_skipped() {
    let data = DemoBuilder::new()
        .frame(7, 0, &[0x1A, 0x05, 0x00])
        .frame(3, 1, &[])
        .build();

    let summary = vdem::avec::decode_reader(&data[..], &ProtoSchema, &mut Collect::default())
        .unwrap();

    assert_eq!(summary.frames, 2);
    assert_eq!(summary.skipped_packets, 1);
}

#[test]
fn malformed_header_is_fatal() {
    let data = DemoBuilder::new().frame(1, 0, &[0x0A, 0x05]).build();

    assert!(matches!(
        vdem::avec::decode_reader(&data[..], &ProtoSchema, &mut Collect::default()),
        Err(reader::Error::Dispatch(dispatch::Error::Header(_)))
    ));
}

#[test]
fn malformed_post_match_is_fatal() {
    let bits = BitWriter::new().message(316, &[0x0A, 0x05]).finish();

    let data = DemoBuilder::new()
        .frame(7, 12, &Packet { data: Some(bits) }.encode_to_vec())
        .build();

    assert!(matches!(
        vdem::avec::decode_reader(&data[..], &ProtoSchema, &mut Collect::default()),
        Err(reader::Error::Dispatch(dispatch::Error::PostMatch { tick: 12, .. }))
    ));
}

#[test]
fn post_match_without_header() {
    let data = DemoBuilder::new()
        .frame(7, 0, &packet(BitWriter::new().message(316, &post_match_details())))
        .build();

    let mut collect = Collect::default();
    vdem::avec::decode_reader(&data[..], &ProtoSchema, &mut collect).unwrap();

    assert_eq!(collect.post_matches.len(), 1);
    assert_eq!(collect.post_matches[0].0, None);
}
