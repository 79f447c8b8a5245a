// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON codec built on `serde_json`.
//!
//! The default mode keys fields by numeric id (`"1"`, `"2"`) and
//! writes enums as numbers, which survives field renames. Named mode
//! uses declared field and enum names instead. Readers accept either
//! keying regardless of mode, skip unknown keys, and consume exactly
//! one JSON value from the stream.
//!
//! Messages whose type opts in via the `json.compact` annotation, whose
//! shape qualifies for the positional layout (see
//! [`MessageDescriptor::is_json_compactible`]) and whose present fields
//! form a prefix of the declared field ids are written as a positional
//! array instead of an object.

use std::io::{Read, Write};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use serde_json::{json, Map as JsonMap, Number};

use crate::descriptor::{FieldType, MessageDescriptor};
use crate::ser::{SerializeError, Serializer};
use crate::value::{MessageValue, Value};

/// Text codec for debugging, config files and HTTP interchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    named: bool,
    pretty: bool,
}

impl JsonSerializer {
    /// Compact output keyed by field id, enums as numbers.
    pub fn new() -> Self {
        Self {
            named: false,
            pretty: false,
        }
    }

    /// Compact output keyed by field name, enums by name.
    pub fn named() -> Self {
        Self {
            named: true,
            pretty: false,
        }
    }

    /// Indented, name-keyed output for humans. Integral doubles are
    /// printed without a fraction, so `-2.0` renders as `-2`.
    pub fn pretty() -> Self {
        Self {
            named: true,
            pretty: true,
        }
    }
}

impl Serializer for JsonSerializer {
    fn binary_protocol(&self) -> bool {
        false
    }

    fn serialize(
        &self,
        out: &mut dyn Write,
        message: &MessageValue,
    ) -> Result<usize, SerializeError> {
        let tree = message_to_json(message, self.named, self.pretty)?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&tree)?
        } else {
            serde_json::to_string(&tree)?
        };
        out.write_all(text.as_bytes())?;
        Ok(text.len())
    }

    fn deserialize(
        &self,
        input: &mut dyn Read,
        descriptor: &Arc<MessageDescriptor>,
    ) -> Result<MessageValue, SerializeError> {
        let mut stream = serde_json::Deserializer::from_reader(input).into_iter();
        let tree: serde_json::Value = match stream.next() {
            Some(result) => result?,
            None => return Err(SerializeError::UnexpectedEnd),
        };
        message_from_json(&tree, descriptor)
    }
}

fn message_to_json(
    message: &MessageValue,
    named: bool,
    pretty: bool,
) -> Result<serde_json::Value, SerializeError> {
    let descriptor = message.descriptor();
    if descriptor.is_json_compactible() && is_id_prefix(message) {
        let mut row = Vec::with_capacity(message.field_count());
        for (_, value) in message.fields() {
            row.push(value_to_json(value, named, pretty)?);
        }
        return Ok(serde_json::Value::Array(row));
    }

    let mut object = JsonMap::with_capacity(message.field_count());
    for (id, value) in message.fields() {
        let key = match descriptor.field_by_id(id) {
            Some(field) if named => field.name.clone(),
            _ => id.to_string(),
        };
        object.insert(key, value_to_json(value, named, pretty)?);
    }
    Ok(serde_json::Value::Object(object))
}

/// Present fields must be exactly the first N declared ids for the
/// positional form to be readable.
fn is_id_prefix(message: &MessageValue) -> bool {
    let fields = message.descriptor().fields();
    if message.field_count() > fields.len() {
        return false;
    }
    fields
        .iter()
        .take(message.field_count())
        .all(|f| message.has(f.id))
}

fn value_to_json(
    value: &Value,
    named: bool,
    pretty: bool,
) -> Result<serde_json::Value, SerializeError> {
    match value {
        Value::Bool(v) => Ok(json!(v)),
        Value::Byte(v) => Ok(json!(v)),
        Value::I16(v) => Ok(json!(v)),
        Value::I32(v) => Ok(json!(v)),
        Value::I64(v) => Ok(json!(v)),
        Value::Double(v) => double_to_json(*v, pretty),
        Value::Str(v) => Ok(json!(v)),
        Value::Binary(v) => Ok(json!(STANDARD_NO_PAD.encode(v))),
        Value::Enum(id, name) => {
            if named && !name.is_empty() {
                Ok(json!(name))
            } else {
                Ok(json!(id))
            }
        }
        Value::List(items) | Value::Set(items) => {
            let mut row = Vec::with_capacity(items.len());
            for item in items {
                row.push(value_to_json(item, named, pretty)?);
            }
            Ok(serde_json::Value::Array(row))
        }
        Value::Map(entries) => {
            let mut object = JsonMap::with_capacity(entries.len());
            for (key, val) in entries {
                object.insert(key_to_string(key, named, pretty)?, value_to_json(val, named, pretty)?);
            }
            Ok(serde_json::Value::Object(object))
        }
        Value::Message(m) => message_to_json(m, named, pretty),
    }
}

fn double_to_json(v: f64, pretty: bool) -> Result<serde_json::Value, SerializeError> {
    if !v.is_finite() {
        return Err(SerializeError::Malformed(format!(
            "double {} has no json representation",
            v
        )));
    }
    if pretty && v.fract() == 0.0 && v.abs() < 9.0e15 {
        return Ok(serde_json::Value::Number(Number::from(v as i64)));
    }
    Number::from_f64(v)
        .map(serde_json::Value::Number)
        .ok_or_else(|| SerializeError::Malformed(format!("double {} has no json representation", v)))
}

/// JSON object keys are strings, so map keys get stringified. Message
/// keys embed their compact JSON rendering.
fn key_to_string(key: &Value, named: bool, pretty: bool) -> Result<String, SerializeError> {
    match key {
        Value::Bool(v) => Ok(v.to_string()),
        Value::Byte(v) => Ok(v.to_string()),
        Value::I16(v) => Ok(v.to_string()),
        Value::I32(v) => Ok(v.to_string()),
        Value::I64(v) => Ok(v.to_string()),
        Value::Double(v) => Ok(v.to_string()),
        Value::Str(v) => Ok(v.clone()),
        Value::Binary(v) => Ok(STANDARD_NO_PAD.encode(v)),
        Value::Enum(id, name) => {
            if named && !name.is_empty() {
                Ok(name.clone())
            } else {
                Ok(id.to_string())
            }
        }
        Value::Message(m) => {
            let tree = message_to_json(m, named, pretty)?;
            Ok(serde_json::to_string(&tree)?)
        }
        Value::List(_) | Value::Set(_) | Value::Map(_) => Err(SerializeError::Malformed(
            "container values cannot be map keys".into(),
        )),
    }
}

fn message_from_json(
    tree: &serde_json::Value,
    descriptor: &Arc<MessageDescriptor>,
) -> Result<MessageValue, SerializeError> {
    let mut builder = MessageValue::builder(descriptor.clone());
    match tree {
        serde_json::Value::Object(object) => {
            for (key, node) in object {
                let field = match key.parse::<i16>() {
                    Ok(id) => descriptor.field_by_id(id),
                    Err(_) => descriptor.field_by_name(key),
                };
                match field {
                    Some(field) => {
                        let value = value_from_json(node, &field.field_type)?;
                        builder.set(field.id, value)?;
                    }
                    None => log::debug!(
                        "[JsonSerializer::deserialize] skipping unknown key '{}' in {}",
                        key,
                        descriptor.qualified_name()
                    ),
                }
            }
        }
        serde_json::Value::Array(row) if descriptor.is_json_compactible() => {
            let fields = descriptor.fields();
            if row.len() > fields.len() {
                return Err(SerializeError::Malformed(format!(
                    "{} positional values for {} with {} fields",
                    row.len(),
                    descriptor.qualified_name(),
                    fields.len()
                )));
            }
            for (field, node) in fields.iter().zip(row) {
                let value = value_from_json(node, &field.field_type)?;
                builder.set(field.id, value)?;
            }
        }
        other => {
            return Err(SerializeError::Malformed(format!(
                "expected json object for {}, got {}",
                descriptor.qualified_name(),
                json_type_name(other)
            )))
        }
    }
    Ok(builder.build()?)
}

fn value_from_json(
    node: &serde_json::Value,
    field_type: &FieldType,
) -> Result<Value, SerializeError> {
    match field_type {
        FieldType::Void => Err(SerializeError::Malformed("void value in json".into())),
        FieldType::Bool => node
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| type_error("bool", node)),
        FieldType::Byte => int_from_json(node, i64::from(i8::MIN), i64::from(i8::MAX))
            .map(|v| Value::Byte(v as i8)),
        FieldType::I16 => int_from_json(node, i64::from(i16::MIN), i64::from(i16::MAX))
            .map(|v| Value::I16(v as i16)),
        FieldType::I32 => int_from_json(node, i64::from(i32::MIN), i64::from(i32::MAX))
            .map(|v| Value::I32(v as i32)),
        FieldType::I64 => node
            .as_i64()
            .map(Value::I64)
            .ok_or_else(|| type_error("i64", node)),
        FieldType::Double => node
            .as_f64()
            .map(Value::Double)
            .ok_or_else(|| type_error("double", node)),
        FieldType::Str => node
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(|| type_error("string", node)),
        FieldType::Binary => {
            let text = node.as_str().ok_or_else(|| type_error("binary", node))?;
            decode_base64(text).map(Value::Binary)
        }
        FieldType::Enum(desc) => match node {
            serde_json::Value::Number(_) => {
                let id = int_from_json(node, i64::from(i32::MIN), i64::from(i32::MAX))? as i32;
                let name = desc
                    .value_by_id(id)
                    .map(|v| v.name.clone())
                    .unwrap_or_default();
                Ok(Value::Enum(id, name))
            }
            serde_json::Value::String(name) => desc
                .value_by_name(name)
                .map(|v| Value::Enum(v.id, v.name.clone()))
                .ok_or_else(|| {
                    SerializeError::Malformed(format!(
                        "unknown value '{}' for enum {}",
                        name,
                        desc.qualified_name()
                    ))
                }),
            other => Err(type_error("enum", other)),
        },
        FieldType::Message(msg_ref) => {
            let desc = msg_ref.get().ok_or_else(|| {
                SerializeError::Malformed(format!(
                    "unresolved message type {}",
                    msg_ref.qualified_name()
                ))
            })?;
            Ok(Value::Message(message_from_json(node, &desc)?))
        }
        FieldType::List(item_type) => items_from_json(node, item_type).map(Value::List),
        FieldType::Set(item_type) => items_from_json(node, item_type).map(Value::set_of),
        FieldType::Map(key_type, value_type) => {
            let object = node.as_object().ok_or_else(|| type_error("map", node))?;
            let mut entries = Vec::with_capacity(object.len());
            for (key, val) in object {
                entries.push((
                    key_from_string(key, key_type)?,
                    value_from_json(val, value_type)?,
                ));
            }
            Ok(Value::map_of(entries))
        }
    }
}

fn items_from_json(
    node: &serde_json::Value,
    item_type: &FieldType,
) -> Result<Vec<Value>, SerializeError> {
    let row = node.as_array().ok_or_else(|| type_error("array", node))?;
    let mut items = Vec::with_capacity(row.len());
    for entry in row {
        items.push(value_from_json(entry, item_type)?);
    }
    Ok(items)
}

fn key_from_string(key: &str, key_type: &FieldType) -> Result<Value, SerializeError> {
    let parse_err =
        |kind: &str| SerializeError::Malformed(format!("map key '{}' is not a {}", key, kind));
    match key_type {
        FieldType::Bool => match key {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(parse_err("bool")),
        },
        FieldType::Byte => key.parse().map(Value::Byte).map_err(|_| parse_err("byte")),
        FieldType::I16 => key.parse().map(Value::I16).map_err(|_| parse_err("i16")),
        FieldType::I32 => key.parse().map(Value::I32).map_err(|_| parse_err("i32")),
        FieldType::I64 => key.parse().map(Value::I64).map_err(|_| parse_err("i64")),
        FieldType::Double => key
            .parse()
            .map(Value::Double)
            .map_err(|_| parse_err("double")),
        FieldType::Str => Ok(Value::Str(key.to_string())),
        FieldType::Binary => decode_base64(key).map(Value::Binary),
        FieldType::Enum(desc) => {
            if let Ok(id) = key.parse::<i32>() {
                let name = desc
                    .value_by_id(id)
                    .map(|v| v.name.clone())
                    .unwrap_or_default();
                return Ok(Value::Enum(id, name));
            }
            desc.value_by_name(key)
                .map(|v| Value::Enum(v.id, v.name.clone()))
                .ok_or_else(|| parse_err("known enum value"))
        }
        FieldType::Message(msg_ref) => {
            let desc = msg_ref.get().ok_or_else(|| {
                SerializeError::Malformed(format!(
                    "unresolved message type {}",
                    msg_ref.qualified_name()
                ))
            })?;
            let tree: serde_json::Value = serde_json::from_str(key)?;
            Ok(Value::Message(message_from_json(&tree, &desc)?))
        }
        other => Err(SerializeError::Malformed(format!(
            "{} cannot be a map key",
            other.name()
        ))),
    }
}

fn int_from_json(
    node: &serde_json::Value,
    min: i64,
    max: i64,
) -> Result<i64, SerializeError> {
    let v = node.as_i64().ok_or_else(|| type_error("integer", node))?;
    if v < min || v > max {
        return Err(SerializeError::Malformed(format!(
            "integer {} out of range [{}, {}]",
            v, min, max
        )));
    }
    Ok(v)
}

/// Accepts both padded and unpadded standard base64.
fn decode_base64(text: &str) -> Result<Vec<u8>, SerializeError> {
    STANDARD_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|e| SerializeError::Malformed(format!("invalid base64: {}", e)))
}

fn json_type_name(node: &serde_json::Value) -> &'static str {
    match node {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn type_error(expected: &str, node: &serde_json::Value) -> SerializeError {
    SerializeError::Malformed(format!(
        "expected {}, got {}",
        expected,
        json_type_name(node)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EnumDescriptor, EnumValue, FieldDescriptor, MessageVariant};
    use std::io::Cursor;

    fn status_enum() -> Arc<EnumDescriptor> {
        Arc::new(EnumDescriptor::new(
            "test",
            "Status",
            vec![EnumValue::new(0, "OK"), EnumValue::new(1, "FAILED")],
        ))
    }

    fn job_descriptor() -> Arc<MessageDescriptor> {
        Arc::new(MessageDescriptor::new(
            "test",
            "Job",
            MessageVariant::Struct,
            vec![
                FieldDescriptor::new(1, "id", FieldType::I64),
                FieldDescriptor::new(2, "status", FieldType::Enum(status_enum())),
                FieldDescriptor::new(3, "payload", FieldType::Binary),
            ],
        ))
    }

    fn job() -> MessageValue {
        let mut builder = MessageValue::builder(job_descriptor());
        builder.set(1, 42i64).unwrap();
        builder.set(2, Value::Enum(1, "FAILED".into())).unwrap();
        builder.set(3, vec![0xffu8, 0x00]).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn default_mode_keys_by_id() {
        let mut out = Vec::new();
        JsonSerializer::new().serialize(&mut out, &job()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"1":42,"2":1,"3":"/wA"}"#
        );
    }

    #[test]
    fn named_mode_keys_by_name() {
        let mut out = Vec::new();
        JsonSerializer::named().serialize(&mut out, &job()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"id":42,"status":"FAILED","payload":"/wA"}"#
        );
    }

    #[test]
    fn reader_accepts_both_keyings_and_skips_unknowns() {
        for text in [
            r#"{"1":42,"2":1,"3":"/wA","99":"ignored"}"#,
            r#"{"id":42,"status":"FAILED","payload":"/wA=","future_key":[1,2]}"#,
        ] {
            let decoded = JsonSerializer::new()
                .deserialize(&mut Cursor::new(text.as_bytes()), &job_descriptor())
                .unwrap();
            assert_eq!(decoded, job());
        }
    }

    #[test]
    fn pretty_renders_integral_double_without_fraction() {
        let desc = Arc::new(MessageDescriptor::new(
            "test",
            "P",
            MessageVariant::Struct,
            vec![FieldDescriptor::new(1, "v", FieldType::Double)],
        ));
        let mut builder = MessageValue::builder(desc.clone());
        builder.set(1, -2.0).unwrap();
        let message = builder.build().unwrap();

        let mut out = Vec::new();
        JsonSerializer::pretty().serialize(&mut out, &message).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"v\": -2"), "{}", text);
        assert!(!text.contains("-2.0"), "{}", text);

        let decoded = JsonSerializer::pretty()
            .deserialize(&mut Cursor::new(text.as_bytes()), &desc)
            .unwrap();
        assert_eq!(decoded.get(1), Some(&Value::Double(-2.0)));
    }

    #[test]
    fn compact_annotated_message_round_trips_as_array() {
        let desc = Arc::new(
            MessageDescriptor::new(
                "test",
                "Version",
                MessageVariant::Struct,
                vec![
                    FieldDescriptor::new(1, "major", FieldType::I32),
                    FieldDescriptor::new(2, "minor", FieldType::I32),
                    FieldDescriptor::new(3, "tag", FieldType::Str),
                ],
            )
            .with_json_compact(),
        );

        let mut prefix = MessageValue::builder(desc.clone());
        prefix.set(1, 1i32).unwrap();
        prefix.set(2, 4i32).unwrap();
        let prefix = prefix.build().unwrap();

        let mut out = Vec::new();
        JsonSerializer::new().serialize(&mut out, &prefix).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "[1,4]");
        let decoded = JsonSerializer::new()
            .deserialize(&mut Cursor::new(&out), &desc)
            .unwrap();
        assert_eq!(decoded, prefix);

        // A gap in the set fields forces the object form.
        let mut gapped = MessageValue::builder(desc.clone());
        gapped.set(1, 1i32).unwrap();
        gapped.set(3, "rc").unwrap();
        let gapped = gapped.build().unwrap();
        let mut out = Vec::new();
        JsonSerializer::new().serialize(&mut out, &gapped).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"{"1":1,"3":"rc"}"#);
    }

    #[test]
    fn unqualified_compact_annotation_keeps_object_form() {
        // Declaration order differs from id order, so the positional
        // layout would pair values with the wrong fields. The writer
        // must stay on the object form and round-trip exactly.
        let desc = Arc::new(
            MessageDescriptor::new(
                "test",
                "Swapped",
                MessageVariant::Struct,
                vec![
                    FieldDescriptor::new(2, "b", FieldType::I32),
                    FieldDescriptor::new(1, "a", FieldType::I32),
                ],
            )
            .with_json_compact(),
        );
        let mut builder = MessageValue::builder(desc.clone());
        builder.set(2, 111i32).unwrap();
        builder.set(1, 222i32).unwrap();
        let original = builder.build().unwrap();

        let mut out = Vec::new();
        JsonSerializer::new().serialize(&mut out, &original).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with('{'), "{}", text);

        let decoded = JsonSerializer::new()
            .deserialize(&mut Cursor::new(&out), &desc)
            .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn consumes_one_value_leaving_the_rest() {
        let text = r#"{"1":1} {"1":2}"#;
        let mut cursor = Cursor::new(text.as_bytes());
        let desc = Arc::new(MessageDescriptor::new(
            "test",
            "N",
            MessageVariant::Struct,
            vec![FieldDescriptor::new(1, "v", FieldType::I32)],
        ));
        let first = JsonSerializer::new().deserialize(&mut cursor, &desc).unwrap();
        assert_eq!(first.get(1), Some(&Value::I32(1)));
        let second = JsonSerializer::new().deserialize(&mut cursor, &desc).unwrap();
        assert_eq!(second.get(1), Some(&Value::I32(2)));
    }

    #[test]
    fn map_keys_round_trip() {
        let desc = Arc::new(MessageDescriptor::new(
            "test",
            "Scores",
            MessageVariant::Struct,
            vec![FieldDescriptor::new(
                1,
                "by_rank",
                FieldType::Map(Box::new(FieldType::I32), Box::new(FieldType::Str)),
            )],
        ));
        let mut builder = MessageValue::builder(desc.clone());
        builder
            .set(
                1,
                Value::map_of(vec![(2i32.into(), "silver".into()), (1i32.into(), "gold".into())]),
            )
            .unwrap();
        let original = builder.build().unwrap();

        let mut out = Vec::new();
        JsonSerializer::new().serialize(&mut out, &original).unwrap();
        let decoded = JsonSerializer::new()
            .deserialize(&mut Cursor::new(&out), &desc)
            .unwrap();
        assert_eq!(decoded, original);
    }
}
