// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

use crate::descriptor::{FieldDescriptor, MessageDescriptor};
use crate::value::{MessageBuilder, Value};

/// An immutable message instance, pairing a descriptor with the set
/// of present fields keyed by field id.
///
/// Absent fields carry no entry at all; a field explicitly set to its
/// zero value is distinguishable from one never set.
#[derive(Debug, Clone)]
pub struct MessageValue {
    descriptor: Arc<MessageDescriptor>,
    fields: BTreeMap<i16, Value>,
}

impl MessageValue {
    pub(crate) fn new(descriptor: Arc<MessageDescriptor>, fields: BTreeMap<i16, Value>) -> Self {
        Self { descriptor, fields }
    }

    /// Start building an instance of the given message type.
    pub fn builder(descriptor: Arc<MessageDescriptor>) -> MessageBuilder {
        MessageBuilder::new(descriptor)
    }

    /// Shorthand for a union carrying exactly the one given field.
    pub fn union_of(
        descriptor: Arc<MessageDescriptor>,
        field_id: i16,
        value: impl Into<Value>,
    ) -> Result<Self, super::ValidationError> {
        let mut builder = MessageBuilder::new(descriptor);
        builder.set(field_id, value.into())?;
        builder.build()
    }

    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    pub fn has(&self, field_id: i16) -> bool {
        self.fields.contains_key(&field_id)
    }

    pub fn get(&self, field_id: i16) -> Option<&Value> {
        self.fields.get(&field_id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let field = self.descriptor.field_by_name(name)?;
        self.fields.get(&field.id)
    }

    /// Present fields in ascending field-id order.
    pub fn fields(&self) -> impl Iterator<Item = (i16, &Value)> {
        self.fields.iter().map(|(id, value)| (*id, value))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// For unions, the single present field and its value.
    pub fn union_field(&self) -> Option<(&FieldDescriptor, &Value)> {
        if !self.descriptor.is_union() {
            return None;
        }
        let (id, value) = self.fields.iter().next()?;
        let field = self.descriptor.field_by_id(*id)?;
        Some((field, value))
    }

    /// A builder pre-seeded with this message's fields.
    pub fn mutate(&self) -> MessageBuilder {
        MessageBuilder::seeded(self.descriptor.clone(), self.fields.clone())
    }
}

/// Structural equality; descriptor identity does not matter, only the
/// qualified type name and field contents.
impl PartialEq for MessageValue {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.qualified_name() == other.descriptor.qualified_name()
            && self.fields == other.fields
    }
}

/// Canonical rendering `program.Name{field:value,...}` with fields in
/// id order. Stable, so equal messages render identically.
impl fmt::Display for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.descriptor.qualified_name())?;
        let mut first = true;
        for (id, value) in &self.fields {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            match self.descriptor.field_by_id(*id) {
                Some(field) => write!(f, "{}:", field.name)?,
                None => write!(f, "{}:", id)?,
            }
            fmt_value(f, value)?;
        }
        write!(f, "}}")
    }
}

fn fmt_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Bool(v) => write!(f, "{}", v),
        Value::Byte(v) => write!(f, "{}", v),
        Value::I16(v) => write!(f, "{}", v),
        Value::I32(v) => write!(f, "{}", v),
        Value::I64(v) => write!(f, "{}", v),
        Value::Double(v) => {
            if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                write!(f, "{}", *v as i64)
            } else {
                write!(f, "{}", v)
            }
        }
        Value::Str(v) => write!(f, "\"{}\"", v.escape_default()),
        Value::Binary(v) => write!(f, "b64({})", STANDARD_NO_PAD.encode(v)),
        Value::Enum(id, name) => {
            if name.is_empty() {
                write!(f, "{}", id)
            } else {
                write!(f, "{}", name)
            }
        }
        Value::List(items) | Value::Set(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                fmt_value(f, item)?;
            }
            write!(f, "]")
        }
        Value::Map(entries) => {
            write!(f, "{{")?;
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                fmt_value(f, key)?;
                write!(f, ":")?;
                fmt_value(f, val)?;
            }
            write!(f, "}}")
        }
        Value::Message(message) => write!(f, "{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldType, MessageVariant};

    fn point_descriptor() -> Arc<MessageDescriptor> {
        Arc::new(MessageDescriptor::new(
            "geo",
            "Point",
            MessageVariant::Struct,
            vec![
                FieldDescriptor::new(1, "x", FieldType::Double),
                FieldDescriptor::new(2, "y", FieldType::Double),
                FieldDescriptor::new(3, "label", FieldType::Str),
            ],
        ))
    }

    #[test]
    fn display_renders_in_id_order() {
        let mut builder = MessageValue::builder(point_descriptor());
        builder.set(3, "origin").unwrap();
        builder.set(1, 0.0).unwrap();
        builder.set(2, -2.5).unwrap();
        let point = builder.build().unwrap();
        assert_eq!(point.to_string(), "geo.Point{x:0,y:-2.5,label:\"origin\"}");
    }

    #[test]
    fn absent_field_differs_from_zero() {
        let mut with_zero = MessageValue::builder(point_descriptor());
        with_zero.set(1, 0.0).unwrap();
        let with_zero = with_zero.build().unwrap();
        let empty = MessageValue::builder(point_descriptor()).build().unwrap();
        assert!(with_zero.has(1));
        assert!(!empty.has(1));
        assert_ne!(with_zero, empty);
    }

    #[test]
    fn mutate_produces_updated_copy() {
        let mut builder = MessageValue::builder(point_descriptor());
        builder.set(1, 1.0).unwrap();
        let original = builder.build().unwrap();

        let mut changed = original.mutate();
        changed.set(2, 2.0).unwrap();
        let changed = changed.build().unwrap();

        assert!(!original.has(2));
        assert_eq!(changed.get(1), Some(&Value::Double(1.0)));
        assert_eq!(changed.get(2), Some(&Value::Double(2.0)));
    }
}
