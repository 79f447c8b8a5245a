// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact varint-based binary codec, little-endian on the wire.
//!
//! Every field starts with `varint(id << 3 | wire_type)`; a zero
//! varint closes the message. Integers are zigzag varints, bools live
//! entirely in the field header, and collections carry their element
//! wire types inline so unknown fields stay skippable.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::descriptor::{FieldType, MessageDescriptor};
use crate::ser::{SerializeError, Serializer};
use crate::value::{MessageValue, Value};

const STOP: u64 = 0x00;
const NONE: u8 = 0x01;
const TRUE: u8 = 0x02;
const VARINT: u8 = 0x03;
const FIXED_64: u8 = 0x04;
const BINARY: u8 = 0x05;
const MESSAGE: u8 = 0x06;
const COLLECTION: u8 = 0x07;

/// Space-optimized alternative to the default binary format.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastBinarySerializer;

impl FastBinarySerializer {
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for FastBinarySerializer {
    fn binary_protocol(&self) -> bool {
        true
    }

    fn serialize(
        &self,
        out: &mut dyn Write,
        message: &MessageValue,
    ) -> Result<usize, SerializeError> {
        write_message(out, message)
    }

    fn deserialize(
        &self,
        input: &mut dyn Read,
        descriptor: &Arc<MessageDescriptor>,
    ) -> Result<MessageValue, SerializeError> {
        read_message(input, descriptor)
    }
}

fn item_wire_type(field_type: &FieldType) -> u8 {
    match field_type {
        FieldType::Void | FieldType::Bool => VARINT,
        FieldType::Byte
        | FieldType::I16
        | FieldType::I32
        | FieldType::I64
        | FieldType::Enum(_) => VARINT,
        FieldType::Double => FIXED_64,
        FieldType::Str | FieldType::Binary => BINARY,
        FieldType::Message(_) => MESSAGE,
        FieldType::List(_) | FieldType::Set(_) | FieldType::Map(..) => COLLECTION,
    }
}

fn write_message(out: &mut dyn Write, message: &MessageValue) -> Result<usize, SerializeError> {
    let mut len = 0;
    for (id, value) in message.fields() {
        let declared = message.descriptor().field_by_id(id).map(|f| &f.field_type);
        len += write_field(out, id, value, declared)?;
    }
    len += write_varint(out, STOP)?;
    Ok(len)
}

fn write_field(
    out: &mut dyn Write,
    id: i16,
    value: &Value,
    declared: Option<&FieldType>,
) -> Result<usize, SerializeError> {
    let id = id as u64;
    match value {
        Value::Bool(v) => {
            let wire = if *v { TRUE } else { NONE };
            write_varint(out, id << 3 | u64::from(wire))
        }
        Value::Byte(v) => {
            let mut len = write_varint(out, id << 3 | u64::from(VARINT))?;
            len += write_varint(out, zigzag32(i32::from(*v)))?;
            Ok(len)
        }
        Value::I16(v) => {
            let mut len = write_varint(out, id << 3 | u64::from(VARINT))?;
            len += write_varint(out, zigzag32(i32::from(*v)))?;
            Ok(len)
        }
        Value::I32(v) | Value::Enum(v, _) => {
            let mut len = write_varint(out, id << 3 | u64::from(VARINT))?;
            len += write_varint(out, zigzag32(*v))?;
            Ok(len)
        }
        Value::I64(v) => {
            let mut len = write_varint(out, id << 3 | u64::from(VARINT))?;
            len += write_varint(out, zigzag64(*v))?;
            Ok(len)
        }
        Value::Double(v) => {
            let mut len = write_varint(out, id << 3 | u64::from(FIXED_64))?;
            out.write_all(&v.to_le_bytes())?;
            len += 8;
            Ok(len)
        }
        Value::Str(v) => {
            let mut len = write_varint(out, id << 3 | u64::from(BINARY))?;
            len += write_blob(out, v.as_bytes())?;
            Ok(len)
        }
        Value::Binary(v) => {
            let mut len = write_varint(out, id << 3 | u64::from(BINARY))?;
            len += write_blob(out, v)?;
            Ok(len)
        }
        Value::Message(m) => {
            let mut len = write_varint(out, id << 3 | u64::from(MESSAGE))?;
            len += write_message(out, m)?;
            Ok(len)
        }
        Value::List(_) | Value::Set(_) | Value::Map(_) => {
            let mut len = write_varint(out, id << 3 | u64::from(COLLECTION))?;
            len += write_container(out, value, declared)?;
            Ok(len)
        }
    }
}

/// The element wire types come from the declared type, so empty
/// collections still name their element layout. The value-derived
/// fallback only covers values detached from any descriptor.
fn write_container(
    out: &mut dyn Write,
    value: &Value,
    declared: Option<&FieldType>,
) -> Result<usize, SerializeError> {
    match value {
        Value::List(items) | Value::Set(items) => {
            let declared_item = match declared {
                Some(FieldType::List(t)) | Some(FieldType::Set(t)) => Some(&**t),
                _ => None,
            };
            let item_type = declared_item
                .map(item_wire_type)
                .or_else(|| items.first().map(entry_wire_type))
                .unwrap_or(VARINT);
            let mut len = write_varint(out, items.len() as u64)?;
            len += write_varint(out, u64::from(item_type))?;
            for item in items {
                len += write_entry(out, item, declared_item)?;
            }
            Ok(len)
        }
        Value::Map(entries) => {
            let (declared_key, declared_value) = match declared {
                Some(FieldType::Map(k, v)) => (Some(&**k), Some(&**v)),
                _ => (None, None),
            };
            let key_type = declared_key
                .map(item_wire_type)
                .or_else(|| entries.first().map(|(k, _)| entry_wire_type(k)))
                .unwrap_or(VARINT);
            let value_type = declared_value
                .map(item_wire_type)
                .or_else(|| entries.first().map(|(_, v)| entry_wire_type(v)))
                .unwrap_or(VARINT);
            let mut len = write_varint(out, (entries.len() * 2) as u64)?;
            len += write_varint(out, u64::from(key_type) << 3 | u64::from(value_type))?;
            for (key, val) in entries {
                len += write_entry(out, key, declared_key)?;
                len += write_entry(out, val, declared_value)?;
            }
            Ok(len)
        }
        other => Err(SerializeError::Malformed(format!(
            "{} is not a container",
            other.type_name()
        ))),
    }
}

fn entry_wire_type(value: &Value) -> u8 {
    match value {
        Value::Bool(_)
        | Value::Byte(_)
        | Value::I16(_)
        | Value::I32(_)
        | Value::I64(_)
        | Value::Enum(..) => VARINT,
        Value::Double(_) => FIXED_64,
        Value::Str(_) | Value::Binary(_) => BINARY,
        Value::Message(_) => MESSAGE,
        Value::List(_) | Value::Set(_) | Value::Map(_) => COLLECTION,
    }
}

/// Container entries have no field header, so bools become 0/1
/// varints here.
fn write_entry(
    out: &mut dyn Write,
    value: &Value,
    declared: Option<&FieldType>,
) -> Result<usize, SerializeError> {
    match value {
        Value::Bool(v) => write_varint(out, u64::from(*v)),
        Value::Byte(v) => write_varint(out, zigzag32(i32::from(*v))),
        Value::I16(v) => write_varint(out, zigzag32(i32::from(*v))),
        Value::I32(v) | Value::Enum(v, _) => write_varint(out, zigzag32(*v)),
        Value::I64(v) => write_varint(out, zigzag64(*v)),
        Value::Double(v) => {
            out.write_all(&v.to_le_bytes())?;
            Ok(8)
        }
        Value::Str(v) => write_blob(out, v.as_bytes()),
        Value::Binary(v) => write_blob(out, v),
        Value::Message(m) => write_message(out, m),
        Value::List(_) | Value::Set(_) | Value::Map(_) => write_container(out, value, declared),
    }
}

fn write_blob(out: &mut dyn Write, data: &[u8]) -> Result<usize, SerializeError> {
    let mut len = write_varint(out, data.len() as u64)?;
    out.write_all(data)?;
    len += data.len();
    Ok(len)
}

fn read_message(
    input: &mut dyn Read,
    descriptor: &Arc<MessageDescriptor>,
) -> Result<MessageValue, SerializeError> {
    let mut builder = MessageValue::builder(descriptor.clone());
    loop {
        let header = read_varint(input)?;
        if header == STOP {
            break;
        }
        let field_id = (header >> 3) as i16;
        let wire_type = (header & 0x07) as u8;
        match descriptor.field_by_id(field_id) {
            Some(field) => {
                let value = read_field(input, wire_type, &field.field_type)?;
                builder.set(field_id, value)?;
            }
            None => {
                log::debug!(
                    "[FastBinarySerializer::deserialize] skipping unknown field {} in {}",
                    field_id,
                    descriptor.qualified_name()
                );
                skip_value(input, wire_type)?;
            }
        }
    }
    Ok(builder.build()?)
}

fn read_field(
    input: &mut dyn Read,
    wire_type: u8,
    field_type: &FieldType,
) -> Result<Value, SerializeError> {
    match wire_type {
        NONE => Ok(Value::Bool(false)),
        TRUE => Ok(Value::Bool(true)),
        VARINT => {
            let raw = read_varint(input)?;
            varint_value(raw, field_type)
        }
        FIXED_64 => {
            let mut buf = [0u8; 8];
            input.read_exact(&mut buf)?;
            Ok(Value::Double(f64::from_le_bytes(buf)))
        }
        BINARY => {
            let data = read_blob(input)?;
            match field_type {
                FieldType::Str => String::from_utf8(data)
                    .map(Value::Str)
                    .map_err(|e| SerializeError::Malformed(format!("invalid utf-8 string: {}", e))),
                FieldType::Binary => Ok(Value::Binary(data)),
                other => Err(SerializeError::Malformed(format!(
                    "binary data for {} field",
                    other.name()
                ))),
            }
        }
        MESSAGE => match field_type {
            FieldType::Message(msg_ref) => {
                let desc = msg_ref.get().ok_or_else(|| {
                    SerializeError::Malformed(format!(
                        "unresolved message type {}",
                        msg_ref.qualified_name()
                    ))
                })?;
                Ok(Value::Message(read_message(input, &desc)?))
            }
            other => Err(SerializeError::Malformed(format!(
                "message data for {} field",
                other.name()
            ))),
        },
        COLLECTION => read_collection(input, field_type),
        other => Err(SerializeError::BadWireType { tag: other }),
    }
}

fn varint_value(raw: u64, field_type: &FieldType) -> Result<Value, SerializeError> {
    match field_type {
        FieldType::Bool => Ok(Value::Bool(raw != 0)),
        FieldType::Byte => Ok(Value::Byte(unzigzag32(raw) as i8)),
        FieldType::I16 => Ok(Value::I16(unzigzag32(raw) as i16)),
        FieldType::I32 => Ok(Value::I32(unzigzag32(raw))),
        FieldType::I64 => Ok(Value::I64(unzigzag64(raw))),
        FieldType::Enum(desc) => {
            let id = unzigzag32(raw);
            let name = desc
                .value_by_id(id)
                .map(|v| v.name.clone())
                .unwrap_or_default();
            Ok(Value::Enum(id, name))
        }
        other => Err(SerializeError::Malformed(format!(
            "varint data for {} field",
            other.name()
        ))),
    }
}

fn read_collection(input: &mut dyn Read, field_type: &FieldType) -> Result<Value, SerializeError> {
    match field_type {
        FieldType::Map(key_type, value_type) => {
            let count = read_varint(input)? as usize;
            let type_tag = read_varint(input)?;
            let wire_value = (type_tag & 0x07) as u8;
            let wire_key = if type_tag > 0x07 {
                (type_tag >> 3) as u8
            } else {
                wire_value
            };
            let mut entries = Vec::with_capacity((count / 2).min(1 << 16));
            let mut read = 0;
            while read < count {
                let key = read_field(input, wire_key, key_type)?;
                let value = read_field(input, wire_value, value_type)?;
                entries.push((key, value));
                read += 2;
            }
            Ok(Value::map_of(entries))
        }
        FieldType::List(item_type) | FieldType::Set(item_type) => {
            let count = read_varint(input)? as usize;
            let wire_item = (read_varint(input)? & 0x07) as u8;
            let mut items = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                items.push(read_field(input, wire_item, item_type)?);
            }
            Ok(match field_type {
                FieldType::Set(_) => Value::set_of(items),
                _ => Value::List(items),
            })
        }
        other => Err(SerializeError::Malformed(format!(
            "collection data for {} field",
            other.name()
        ))),
    }
}

fn skip_value(input: &mut dyn Read, wire_type: u8) -> Result<(), SerializeError> {
    match wire_type {
        NONE | TRUE => Ok(()),
        VARINT => {
            read_varint(input)?;
            Ok(())
        }
        FIXED_64 => {
            let mut buf = [0u8; 8];
            input.read_exact(&mut buf)?;
            Ok(())
        }
        BINARY => {
            read_blob(input)?;
            Ok(())
        }
        MESSAGE => loop {
            let header = read_varint(input)?;
            if header == STOP {
                return Ok(());
            }
            skip_value(input, (header & 0x07) as u8)?;
        },
        COLLECTION => {
            let count = read_varint(input)? as usize;
            let type_tag = read_varint(input)?;
            let wire_value = (type_tag & 0x07) as u8;
            let wire_key = if type_tag > 0x07 {
                (type_tag >> 3) as u8
            } else {
                wire_value
            };
            for i in 0..count {
                if i % 2 == 0 {
                    skip_value(input, wire_key)?;
                } else {
                    skip_value(input, wire_value)?;
                }
            }
            Ok(())
        }
        other => Err(SerializeError::BadWireType { tag: other }),
    }
}

fn zigzag32(v: i32) -> u64 {
    (((v << 1) ^ (v >> 31)) as u32) as u64
}

fn zigzag64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag32(raw: u64) -> i32 {
    let raw = raw as u32;
    ((raw >> 1) as i32) ^ -((raw & 1) as i32)
}

fn unzigzag64(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

fn write_varint(out: &mut dyn Write, mut v: u64) -> Result<usize, SerializeError> {
    let mut len = 0;
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.write_all(&[byte])?;
            return Ok(len + 1);
        }
        out.write_all(&[byte | 0x80])?;
        len += 1;
    }
}

fn read_varint(input: &mut dyn Read) -> Result<u64, SerializeError> {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let mut buf = [0u8; 1];
        input.read_exact(&mut buf)?;
        let byte = buf[0];
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(SerializeError::Malformed("varint too long".into()));
        }
    }
}

fn read_blob(input: &mut dyn Read) -> Result<Vec<u8>, SerializeError> {
    let len = read_varint(input)? as usize;
    let mut data = vec![0u8; len];
    input.read_exact(&mut data)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, MessageVariant};
    use std::io::Cursor;

    #[test]
    fn zigzag_round_trip() {
        for v in [0i32, 1, -1, 2, -2, i32::MAX, i32::MIN] {
            assert_eq!(unzigzag32(zigzag32(v)), v);
        }
        for v in [0i64, -1, 150, -150, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag64(zigzag64(v)), v);
        }
    }

    #[test]
    fn varint_round_trip() {
        for v in [0u64, 1, 127, 128, 300, u64::from(u32::MAX), u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, v).unwrap();
            assert_eq!(read_varint(&mut Cursor::new(&buf)).unwrap(), v);
        }
    }

    fn sample_descriptor() -> Arc<MessageDescriptor> {
        Arc::new(MessageDescriptor::new(
            "test",
            "Sample",
            MessageVariant::Struct,
            vec![
                FieldDescriptor::new(1, "count", FieldType::I32),
                FieldDescriptor::new(2, "live", FieldType::Bool),
                FieldDescriptor::new(3, "name", FieldType::Str),
                FieldDescriptor::new(4, "weights", FieldType::List(Box::new(FieldType::Double))),
            ],
        ))
    }

    #[test]
    fn known_byte_layout() {
        let mut builder = MessageValue::builder(sample_descriptor());
        builder.set(1, 1i32).unwrap();
        builder.set(2, true).unwrap();
        let message = builder.build().unwrap();

        let mut out = Vec::new();
        let written = FastBinarySerializer::new().serialize(&mut out, &message).unwrap();
        assert_eq!(written, out.len());
        // field 1 varint header 0x0b, zigzag(1) = 2; field 2 bool-true
        // header 0x12; stop.
        assert_eq!(out, vec![0x0b, 0x02, 0x12, 0x00]);
    }

    #[test]
    fn empty_collection_carries_declared_element_type() {
        let mut builder = MessageValue::builder(sample_descriptor());
        builder.set(4, Value::List(vec![])).unwrap();
        let message = builder.build().unwrap();

        let mut out = Vec::new();
        FastBinarySerializer::new().serialize(&mut out, &message).unwrap();
        // field 4 collection header 0x27, zero items, fixed-64 element
        // type from the declared list<double>; stop.
        assert_eq!(out, vec![0x27, 0x00, 0x04, 0x00]);

        let decoded = FastBinarySerializer::new()
            .deserialize(&mut Cursor::new(&out), &sample_descriptor())
            .unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn round_trip_with_containers() {
        let mut builder = MessageValue::builder(sample_descriptor());
        builder.set(1, -123456i32).unwrap();
        builder.set(2, false).unwrap();
        builder.set(3, "fast").unwrap();
        builder
            .set(4, Value::List(vec![Value::Double(0.5), Value::Double(-2.0)]))
            .unwrap();
        let original = builder.build().unwrap();

        let mut out = Vec::new();
        FastBinarySerializer::new().serialize(&mut out, &original).unwrap();
        let decoded = FastBinarySerializer::new()
            .deserialize(&mut Cursor::new(&out), &sample_descriptor())
            .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        // Writer's schema has an extra string field 9 and an extra
        // collection field 10 the reader does not know.
        let writer_desc = Arc::new(MessageDescriptor::new(
            "test",
            "Sample",
            MessageVariant::Struct,
            vec![
                FieldDescriptor::new(1, "count", FieldType::I32),
                FieldDescriptor::new(9, "extra", FieldType::Str),
                FieldDescriptor::new(10, "more", FieldType::List(Box::new(FieldType::I32))),
            ],
        ));
        let mut builder = MessageValue::builder(writer_desc);
        builder.set(1, 7i32).unwrap();
        builder.set(9, "later").unwrap();
        builder
            .set(10, Value::List(vec![Value::I32(1), Value::I32(2)]))
            .unwrap();
        let written = builder.build().unwrap();

        let mut out = Vec::new();
        FastBinarySerializer::new().serialize(&mut out, &written).unwrap();
        let decoded = FastBinarySerializer::new()
            .deserialize(&mut Cursor::new(&out), &sample_descriptor())
            .unwrap();
        assert_eq!(decoded.get(1), Some(&Value::I32(7)));
        assert_eq!(decoded.field_count(), 1);
    }
}
