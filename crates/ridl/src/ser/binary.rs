// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tag-length-value binary codec, big-endian on the wire.
//!
//! Field layout is `tag:u8 field_id:i16` followed by the value, with a
//! STOP tag closing every message. Readers skip fields whose id the
//! descriptor does not know, so old readers survive new writers.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::descriptor::{FieldType, MessageDescriptor};
use crate::ser::{SerializeError, Serializer};
use crate::value::{MessageValue, Value};

const STOP: u8 = 0;
const BOOL: u8 = 2;
const BYTE: u8 = 3;
const DOUBLE: u8 = 4;
const I16: u8 = 6;
const I32: u8 = 8;
const I64: u8 = 10;
const STRING: u8 = 11;
const STRUCT: u8 = 12;
const MAP: u8 = 13;
const SET: u8 = 14;
const LIST: u8 = 15;

/// Leading marker for version-tagged output. The high bit keeps it
/// out of the tag value space, so readers can always tell the two
/// framings apart.
const VERSION_MAGIC: u8 = 0x82;

/// The default wire format.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer {
    versioned: bool,
}

impl BinarySerializer {
    pub fn new() -> Self {
        Self { versioned: false }
    }

    /// Emit a leading version marker. Readers accept both framings
    /// regardless of this setting.
    pub fn versioned() -> Self {
        Self { versioned: true }
    }
}

impl Serializer for BinarySerializer {
    fn binary_protocol(&self) -> bool {
        true
    }

    fn serialize(
        &self,
        out: &mut dyn Write,
        message: &MessageValue,
    ) -> Result<usize, SerializeError> {
        let mut len = 0;
        if self.versioned {
            out.write_all(&[VERSION_MAGIC])?;
            len += 1;
        }
        len += write_message(out, message)?;
        Ok(len)
    }

    fn deserialize(
        &self,
        input: &mut dyn Read,
        descriptor: &Arc<MessageDescriptor>,
    ) -> Result<MessageValue, SerializeError> {
        let first = read_u8(input)?;
        let pending = if first == VERSION_MAGIC {
            None
        } else {
            Some(first)
        };
        read_message(input, descriptor, pending)
    }
}

fn wire_tag(field_type: &FieldType) -> u8 {
    match field_type {
        FieldType::Void => STOP,
        FieldType::Bool => BOOL,
        FieldType::Byte => BYTE,
        FieldType::Double => DOUBLE,
        FieldType::I16 => I16,
        FieldType::I32 | FieldType::Enum(_) => I32,
        FieldType::I64 => I64,
        FieldType::Str | FieldType::Binary => STRING,
        FieldType::Message(_) => STRUCT,
        FieldType::Map(..) => MAP,
        FieldType::Set(_) => SET,
        FieldType::List(_) => LIST,
    }
}

fn write_message(out: &mut dyn Write, message: &MessageValue) -> Result<usize, SerializeError> {
    let mut len = 0;
    for (id, value) in message.fields() {
        let field = message.descriptor().field_by_id(id);
        let tag = match field {
            Some(field) => wire_tag(&field.field_type),
            None => value_tag(value),
        };
        out.write_all(&[tag])?;
        out.write_all(&id.to_be_bytes())?;
        len += 3;
        len += write_value(out, value, field.map(|f| &f.field_type))?;
    }
    out.write_all(&[STOP])?;
    Ok(len + 1)
}

fn value_tag(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => BOOL,
        Value::Byte(_) => BYTE,
        Value::I16(_) => I16,
        Value::I32(_) | Value::Enum(..) => I32,
        Value::I64(_) => I64,
        Value::Double(_) => DOUBLE,
        Value::Str(_) | Value::Binary(_) => STRING,
        Value::Message(_) => STRUCT,
        Value::Map(_) => MAP,
        Value::Set(_) => SET,
        Value::List(_) => LIST,
    }
}

/// Containers take their element tags from the declared type, so an
/// empty container still names its element type on the wire. The
/// value-derived tag only covers values detached from any descriptor.
fn write_value(
    out: &mut dyn Write,
    value: &Value,
    declared: Option<&FieldType>,
) -> Result<usize, SerializeError> {
    match value {
        Value::Bool(v) => {
            out.write_all(&[u8::from(*v)])?;
            Ok(1)
        }
        Value::Byte(v) => {
            out.write_all(&v.to_be_bytes())?;
            Ok(1)
        }
        Value::I16(v) => {
            out.write_all(&v.to_be_bytes())?;
            Ok(2)
        }
        Value::I32(v) => {
            out.write_all(&v.to_be_bytes())?;
            Ok(4)
        }
        Value::Enum(v, _) => {
            out.write_all(&v.to_be_bytes())?;
            Ok(4)
        }
        Value::I64(v) => {
            out.write_all(&v.to_be_bytes())?;
            Ok(8)
        }
        Value::Double(v) => {
            out.write_all(&v.to_be_bytes())?;
            Ok(8)
        }
        Value::Str(v) => write_bytes(out, v.as_bytes()),
        Value::Binary(v) => write_bytes(out, v),
        Value::Message(m) => write_message(out, m),
        Value::List(items) | Value::Set(items) => {
            let item_type = match declared {
                Some(FieldType::List(t)) | Some(FieldType::Set(t)) => Some(&**t),
                _ => None,
            };
            let tag = item_type
                .map(wire_tag)
                .or_else(|| items.first().map(value_tag))
                .unwrap_or(STOP);
            out.write_all(&[tag])?;
            out.write_all(&(items.len() as u32).to_be_bytes())?;
            let mut len = 5;
            for item in items {
                len += write_value(out, item, item_type)?;
            }
            Ok(len)
        }
        Value::Map(entries) => {
            let (key_type, value_type) = match declared {
                Some(FieldType::Map(k, v)) => (Some(&**k), Some(&**v)),
                _ => (None, None),
            };
            let key_tag = key_type
                .map(wire_tag)
                .or_else(|| entries.first().map(|(k, _)| value_tag(k)))
                .unwrap_or(STOP);
            let val_tag = value_type
                .map(wire_tag)
                .or_else(|| entries.first().map(|(_, v)| value_tag(v)))
                .unwrap_or(STOP);
            out.write_all(&[key_tag, val_tag])?;
            out.write_all(&(entries.len() as u32).to_be_bytes())?;
            let mut len = 6;
            for (key, val) in entries {
                len += write_value(out, key, key_type)?;
                len += write_value(out, val, value_type)?;
            }
            Ok(len)
        }
    }
}

fn write_bytes(out: &mut dyn Write, data: &[u8]) -> Result<usize, SerializeError> {
    out.write_all(&(data.len() as u32).to_be_bytes())?;
    out.write_all(data)?;
    Ok(4 + data.len())
}

/// Read a message body. `pending` is a tag byte already consumed from
/// the stream by version-marker detection.
fn read_message(
    input: &mut dyn Read,
    descriptor: &Arc<MessageDescriptor>,
    mut pending: Option<u8>,
) -> Result<MessageValue, SerializeError> {
    let mut builder = MessageValue::builder(descriptor.clone());
    loop {
        let tag = match pending.take() {
            Some(t) => t,
            None => read_u8(input)?,
        };
        if tag == STOP {
            break;
        }
        let field_id = read_i16(input)?;
        match descriptor.field_by_id(field_id) {
            Some(field) if wire_tag(&field.field_type) == tag => {
                let value = read_value(input, &field.field_type)?;
                builder.set(field_id, value)?;
            }
            _ => {
                log::debug!(
                    "[BinarySerializer::deserialize] skipping unknown field {} (tag {}) in {}",
                    field_id,
                    tag,
                    descriptor.qualified_name()
                );
                skip_value(input, tag)?;
            }
        }
    }
    Ok(builder.build()?)
}

fn read_value(input: &mut dyn Read, field_type: &FieldType) -> Result<Value, SerializeError> {
    match field_type {
        FieldType::Void => Err(SerializeError::Malformed("void value on the wire".into())),
        FieldType::Bool => Ok(Value::Bool(read_u8(input)? != 0)),
        FieldType::Byte => Ok(Value::Byte(read_u8(input)? as i8)),
        FieldType::I16 => Ok(Value::I16(read_i16(input)?)),
        FieldType::I32 => Ok(Value::I32(read_i32(input)?)),
        FieldType::I64 => {
            let mut buf = [0u8; 8];
            input.read_exact(&mut buf)?;
            Ok(Value::I64(i64::from_be_bytes(buf)))
        }
        FieldType::Double => {
            let mut buf = [0u8; 8];
            input.read_exact(&mut buf)?;
            Ok(Value::Double(f64::from_be_bytes(buf)))
        }
        FieldType::Str => {
            let data = read_blob(input)?;
            String::from_utf8(data)
                .map(Value::Str)
                .map_err(|e| SerializeError::Malformed(format!("invalid utf-8 string: {}", e)))
        }
        FieldType::Binary => Ok(Value::Binary(read_blob(input)?)),
        FieldType::Enum(desc) => {
            let id = read_i32(input)?;
            let name = desc
                .value_by_id(id)
                .map(|v| v.name.clone())
                .unwrap_or_default();
            Ok(Value::Enum(id, name))
        }
        FieldType::Message(msg_ref) => {
            let desc = msg_ref.get().ok_or_else(|| {
                SerializeError::Malformed(format!(
                    "unresolved message type {}",
                    msg_ref.qualified_name()
                ))
            })?;
            Ok(Value::Message(read_message(input, &desc, None)?))
        }
        FieldType::List(item_type) => Ok(Value::List(read_items(input, item_type)?)),
        FieldType::Set(item_type) => Ok(Value::set_of(read_items(input, item_type)?)),
        FieldType::Map(key_type, value_type) => {
            let key_tag = read_u8(input)?;
            let val_tag = read_u8(input)?;
            let count = read_u32(input)? as usize;
            if count > 0 {
                check_elem_tag(key_tag, key_type)?;
                check_elem_tag(val_tag, value_type)?;
            }
            let mut entries = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                let key = read_value(input, key_type)?;
                let value = read_value(input, value_type)?;
                entries.push((key, value));
            }
            Ok(Value::map_of(entries))
        }
    }
}

fn read_items(input: &mut dyn Read, item_type: &FieldType) -> Result<Vec<Value>, SerializeError> {
    let elem_tag = read_u8(input)?;
    let count = read_u32(input)? as usize;
    if count > 0 {
        check_elem_tag(elem_tag, item_type)?;
    }
    let mut items = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        items.push(read_value(input, item_type)?);
    }
    Ok(items)
}

fn check_elem_tag(tag: u8, expected: &FieldType) -> Result<(), SerializeError> {
    if tag == wire_tag(expected) {
        Ok(())
    } else {
        Err(SerializeError::Malformed(format!(
            "container element tag {} does not match declared type {}",
            tag,
            expected.name()
        )))
    }
}

fn skip_value(input: &mut dyn Read, tag: u8) -> Result<(), SerializeError> {
    match tag {
        BOOL | BYTE => skip_exact(input, 1),
        I16 => skip_exact(input, 2),
        I32 => skip_exact(input, 4),
        I64 | DOUBLE => skip_exact(input, 8),
        STRING => {
            let len = read_u32(input)? as usize;
            skip_exact(input, len)
        }
        STRUCT => loop {
            let inner = read_u8(input)?;
            if inner == STOP {
                return Ok(());
            }
            read_i16(input)?;
            skip_value(input, inner)?;
        },
        MAP => {
            let key_tag = read_u8(input)?;
            let val_tag = read_u8(input)?;
            let count = read_u32(input)?;
            for _ in 0..count {
                skip_value(input, key_tag)?;
                skip_value(input, val_tag)?;
            }
            Ok(())
        }
        SET | LIST => {
            let elem_tag = read_u8(input)?;
            let count = read_u32(input)?;
            for _ in 0..count {
                skip_value(input, elem_tag)?;
            }
            Ok(())
        }
        other => Err(SerializeError::BadWireType { tag: other }),
    }
}

fn skip_exact(input: &mut dyn Read, len: usize) -> Result<(), SerializeError> {
    let mut remaining = len as u64;
    while remaining > 0 {
        let copied = std::io::copy(&mut input.take(remaining), &mut std::io::sink())?;
        if copied == 0 {
            return Err(SerializeError::UnexpectedEnd);
        }
        remaining -= copied;
    }
    Ok(())
}

fn read_u8(input: &mut dyn Read) -> Result<u8, SerializeError> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_i16(input: &mut dyn Read) -> Result<i16, SerializeError> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf)?;
    Ok(i16::from_be_bytes(buf))
}

fn read_i32(input: &mut dyn Read) -> Result<i32, SerializeError> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_u32(input: &mut dyn Read) -> Result<u32, SerializeError> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_blob(input: &mut dyn Read) -> Result<Vec<u8>, SerializeError> {
    let len = read_u32(input)? as usize;
    let mut data = vec![0u8; len];
    input.read_exact(&mut data)?;
    Ok(data)
}
