// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! End-to-end tests: IDL source through the loader, value builders and
//! every wire codec.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ridl::descriptor::{MessageDescriptor, Program};
use ridl::{
    BinarySerializer, FastBinarySerializer, FrameReader, FrameWriter, JsonSerializer,
    MessageValue, SerializeError, Serializer, TypeLoader, ValidationError, Value,
};

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn load(dir: &Path, name: &str, content: &str) -> Arc<Program> {
    let path = write_file(dir, name, content);
    TypeLoader::new().load(&path).unwrap()
}

const CALENDAR_IDL: &str = r#"
enum Recurrence {
  NONE = 0,
  DAILY,
  WEEKLY,
}

struct Location {
  1: required double latitude;
  2: required double longitude;
  3: optional string label;
}

struct Event {
  1: required string title;
  2: i64 start_ms;
  3: Recurrence recurrence;
  4: optional Location where;
  5: set<string> attendees;
  6: map<string, i32> reminders;
  7: binary attachment;
}
"#;

fn event_descriptor(dir: &Path) -> Arc<MessageDescriptor> {
    load(dir, "calendar.ridl", CALENDAR_IDL)
        .message("Event")
        .unwrap()
        .clone()
}

fn sample_event(descriptor: &Arc<MessageDescriptor>) -> MessageValue {
    let location = {
        let location_desc = match &descriptor.field_by_name("where").unwrap().field_type {
            ridl::FieldType::Message(r) => r.get().unwrap(),
            other => panic!("expected message type, got {}", other.name()),
        };
        let mut b = MessageValue::builder(location_desc);
        b.set_by_name("latitude", 59.91).unwrap();
        b.set_by_name("longitude", 10.75).unwrap();
        b.set_by_name("label", "Oslo").unwrap();
        b.build().unwrap()
    };

    let mut b = MessageValue::builder(descriptor.clone());
    b.set_by_name("title", "standup").unwrap();
    b.set_by_name("start_ms", 1_700_000_000_000i64).unwrap();
    b.set_by_name("recurrence", Value::Enum(1, "DAILY".into())).unwrap();
    b.set_by_name("where", location).unwrap();
    b.set_by_name("attendees", Value::set_of(vec!["ada".into(), "bob".into()]))
        .unwrap();
    b.set_by_name(
        "reminders",
        Value::map_of(vec![("popup".into(), 10i32.into()), ("mail".into(), 60i32.into())]),
    )
    .unwrap();
    b.set_by_name("attachment", vec![0u8, 255, 128]).unwrap();
    b.build().unwrap()
}

fn codecs() -> Vec<Box<dyn Serializer>> {
    vec![
        Box::new(BinarySerializer::new()),
        Box::new(BinarySerializer::versioned()),
        Box::new(FastBinarySerializer::new()),
        Box::new(JsonSerializer::new()),
        Box::new(JsonSerializer::named()),
        Box::new(JsonSerializer::pretty()),
    ]
}

#[test]
fn every_codec_round_trips_a_nested_message() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = event_descriptor(dir.path());
    let event = sample_event(&descriptor);

    for codec in codecs() {
        let mut wire = Vec::new();
        let written = codec.serialize(&mut wire, &event).unwrap();
        assert_eq!(written, wire.len());
        let decoded = codec
            .deserialize(&mut Cursor::new(&wire), &descriptor)
            .unwrap();
        assert_eq!(decoded, event, "binary_protocol={}", codec.binary_protocol());
    }
}

#[test]
fn old_reader_skips_fields_from_a_newer_schema() {
    let dir = tempfile::tempdir().unwrap();
    // Same type, one schema generation apart.
    let v2 = load(
        dir.path(),
        "note_v2.ridl",
        r#"
        struct Note {
          1: string text;
          2: i64 edited_ms;
          3: list<string> labels;
        }
        "#,
    );
    let v1 = load(
        dir.path(),
        "note_v1.ridl",
        "struct Note { 1: string text; }\n",
    );

    let mut b = MessageValue::builder(v2.message("Note").unwrap().clone());
    b.set_by_name("text", "hello").unwrap();
    b.set_by_name("edited_ms", 12345i64).unwrap();
    b.set_by_name("labels", Value::List(vec!["a".into(), "b".into()]))
        .unwrap();
    let newer = b.build().unwrap();

    for codec in codecs() {
        let mut wire = Vec::new();
        codec.serialize(&mut wire, &newer).unwrap();
        let decoded = codec
            .deserialize(&mut Cursor::new(&wire), v1.message("Note").unwrap())
            .unwrap();
        assert_eq!(decoded.get_by_name("text"), Some(&Value::Str("hello".into())));
        assert_eq!(decoded.field_count(), 1);
    }
}

#[test]
fn union_arity_is_enforced_through_idl_types() {
    let dir = tempfile::tempdir().unwrap();
    let program = load(
        dir.path(),
        "outcome.ridl",
        r#"
        union Outcome {
          1: string ok;
          2: string err;
        }
        "#,
    );
    let outcome = program.message("Outcome").unwrap().clone();

    assert!(matches!(
        MessageValue::builder(outcome.clone()).build(),
        Err(ValidationError::UnionFieldCount { count: 0, .. })
    ));

    let mut two = MessageValue::builder(outcome.clone());
    two.set_by_name("ok", "yes").unwrap();
    two.set_by_name("err", "no").unwrap();
    assert!(matches!(
        two.build(),
        Err(ValidationError::UnionFieldCount { count: 2, .. })
    ));

    let one = MessageValue::union_of(outcome.clone(), 2, "broken").unwrap();
    let mut wire = Vec::new();
    BinarySerializer::new().serialize(&mut wire, &one).unwrap();
    let decoded = BinarySerializer::new()
        .deserialize(&mut Cursor::new(&wire), &outcome)
        .unwrap();
    let (field, value) = decoded.union_field().unwrap();
    assert_eq!(field.name, "err");
    assert_eq!(value, &Value::Str("broken".into()));
}

#[test]
fn framed_messages_arrive_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let program = load(
        dir.path(),
        "ping.ridl",
        "struct Ping { 1: string tag; }\n",
    );
    let ping = program.message("Ping").unwrap().clone();
    let codec = BinarySerializer::new();

    let make = |tag: &str| {
        let mut b = MessageValue::builder(ping.clone());
        b.set(1, tag).unwrap();
        b.build().unwrap()
    };
    // Payloads are 8 bytes of framing plus the tag: 10 and 13 bytes.
    let first = make("ab");
    let second = make("cdefg");

    let mut writer = FrameWriter::new(Vec::new());
    codec.serialize(&mut writer, &first).unwrap();
    writer.complete_frame().unwrap();
    codec.serialize(&mut writer, &second).unwrap();
    writer.complete_frame().unwrap();
    let bytes = writer.into_inner();

    let mut reader = FrameReader::new(Cursor::new(bytes));
    assert_eq!(reader.next_frame().unwrap(), Some(10));
    assert_eq!(codec.deserialize(&mut reader, &ping).unwrap(), first);
    assert_eq!(reader.next_frame().unwrap(), Some(13));
    assert_eq!(codec.deserialize(&mut reader, &ping).unwrap(), second);
    assert_eq!(reader.next_frame().unwrap(), None);
}

#[test]
fn oversized_frame_fails_without_emitting_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let program = load(
        dir.path(),
        "blob.ridl",
        "struct Blob { 1: binary data; }\n",
    );
    let blob = program.message("Blob").unwrap().clone();

    let mut b = MessageValue::builder(blob);
    b.set(1, vec![0u8; 64]).unwrap();
    let message = b.build().unwrap();

    let mut writer = FrameWriter::with_max_frame_size(Vec::new(), 16);
    let err = BinarySerializer::new()
        .serialize(&mut writer, &message)
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("i/o error"), "{}", text);
    writer.discard_frame();
    writer.complete_frame().unwrap();
    assert!(writer.into_inner().is_empty());
}

#[test]
fn recursive_types_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let program = load(
        dir.path(),
        "tree.ridl",
        r#"
        struct Node {
          1: i32 value;
          2: optional Node next;
        }
        "#,
    );
    let node = program.message("Node").unwrap().clone();

    let mut inner = MessageValue::builder(node.clone());
    inner.set(1, 2i32).unwrap();
    let inner = inner.build().unwrap();
    let mut outer = MessageValue::builder(node.clone());
    outer.set(1, 1i32).unwrap();
    outer.set(2, inner).unwrap();
    let outer = outer.build().unwrap();

    for codec in codecs() {
        let mut wire = Vec::new();
        codec.serialize(&mut wire, &outer).unwrap();
        let decoded = codec.deserialize(&mut Cursor::new(&wire), &node).unwrap();
        assert_eq!(decoded, outer);
    }
}

#[test]
fn display_is_canonical_and_stable() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = event_descriptor(dir.path());
    let mut b = MessageValue::builder(descriptor);
    b.set_by_name("title", "retro").unwrap();
    b.set_by_name("recurrence", Value::Enum(2, "WEEKLY".into())).unwrap();
    let event = b.build().unwrap();
    assert_eq!(
        event.to_string(),
        "calendar.Event{title:\"retro\",recurrence:WEEKLY}"
    );
}

#[test]
fn binary_truncation_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = event_descriptor(dir.path());
    let event = sample_event(&descriptor);

    let mut wire = Vec::new();
    BinarySerializer::new().serialize(&mut wire, &event).unwrap();
    wire.truncate(wire.len() / 2);
    assert!(matches!(
        BinarySerializer::new().deserialize(&mut Cursor::new(&wire), &descriptor),
        Err(SerializeError::UnexpectedEnd) | Err(SerializeError::Malformed(_))
    ));
}

#[test]
fn frame_reader_feeds_exactly_one_message_per_frame() {
    // A frame holding two concatenated messages: the codec reads one,
    // the remainder is dropped on next_frame.
    let dir = tempfile::tempdir().unwrap();
    let program = load(dir.path(), "n.ridl", "struct N { 1: i32 v; }\n");
    let n = program.message("N").unwrap().clone();
    let codec = BinarySerializer::new();

    let make = |v: i32| {
        let mut b = MessageValue::builder(n.clone());
        b.set(1, v).unwrap();
        b.build().unwrap()
    };

    let mut writer = FrameWriter::new(Vec::new());
    codec.serialize(&mut writer, &make(1)).unwrap();
    codec.serialize(&mut writer, &make(2)).unwrap();
    writer.complete_frame().unwrap();
    codec.serialize(&mut writer, &make(3)).unwrap();
    writer.complete_frame().unwrap();

    let mut reader = FrameReader::new(Cursor::new(writer.into_inner()));
    reader.next_frame().unwrap();
    assert_eq!(codec.deserialize(&mut reader, &n).unwrap(), make(1));
    // Skip the unread second message by advancing the frame.
    reader.next_frame().unwrap();
    assert_eq!(codec.deserialize(&mut reader, &n).unwrap(), make(3));
}

#[test]
fn write_then_read_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = event_descriptor(dir.path());
    let event = sample_event(&descriptor);

    let path = dir.path().join("event.bin");
    {
        let mut file = std::fs::File::create(&path).unwrap();
        let mut writer = FrameWriter::new(&mut file);
        BinarySerializer::versioned().serialize(&mut writer, &event).unwrap();
        writer.complete_frame().unwrap();
    }

    let file = std::fs::File::open(&path).unwrap();
    let mut reader = FrameReader::new(file);
    reader.next_frame().unwrap().unwrap();
    let decoded = BinarySerializer::new().deserialize(&mut reader, &descriptor).unwrap();
    assert_eq!(decoded, event);
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
}
