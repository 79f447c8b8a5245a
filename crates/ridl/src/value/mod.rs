// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime values for described types.
//!
//! A [`Value`] can hold an instance of anything a descriptor can
//! describe. Message instances ([`MessageValue`]) are immutable once
//! built; changing one means seeding a new [`MessageBuilder`] via
//! `mutate()`.

mod builder;
mod message;

pub use builder::{MessageBuilder, ValidationError};
pub use message::MessageValue;

use crate::descriptor::FieldType;

/// A runtime value of any described type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    Str(String),
    Binary(Vec<u8>),
    /// Enum value and declared name. The name is empty for values read
    /// off the wire that the current descriptor does not know.
    Enum(i32, String),
    List(Vec<Value>),
    /// Element uniqueness is enforced on construction, order preserved.
    Set(Vec<Value>),
    /// Key-unique ordered entries. `Value` holds floats, so this is not
    /// a hash map.
    Map(Vec<(Value, Value)>),
    Message(MessageValue),
}

impl Value {
    /// Whether this value is assignable to a field of the given type.
    pub fn matches(&self, field_type: &FieldType) -> bool {
        match (self, field_type) {
            (Self::Bool(_), FieldType::Bool)
            | (Self::Byte(_), FieldType::Byte)
            | (Self::I16(_), FieldType::I16)
            | (Self::I32(_), FieldType::I32)
            | (Self::I64(_), FieldType::I64)
            | (Self::Double(_), FieldType::Double)
            | (Self::Str(_), FieldType::Str)
            | (Self::Binary(_), FieldType::Binary)
            | (Self::Enum(..), FieldType::Enum(_)) => true,
            (Self::Message(m), FieldType::Message(r)) => {
                m.descriptor().qualified_name() == r.qualified_name()
            }
            (Self::List(items), FieldType::List(item_type))
            | (Self::Set(items), FieldType::Set(item_type)) => {
                items.iter().all(|v| v.matches(item_type))
            }
            (Self::Map(entries), FieldType::Map(key_type, value_type)) => entries
                .iter()
                .all(|(k, v)| k.matches(key_type) && v.matches(value_type)),
            _ => false,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Byte(_) => "byte",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
            Self::Binary(_) => "binary",
            Self::Enum(..) => "enum",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Message(_) => "message",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::I16(v) => Some(i64::from(*v)),
            Self::I32(v) => Some(i64::from(*v)),
            Self::I64(v) => Some(*v),
            Self::Enum(v, _) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageValue> {
        match self {
            Self::Message(v) => Some(v),
            _ => None,
        }
    }

    /// Build a set value, dropping structural duplicates and keeping
    /// first-seen order.
    pub fn set_of(items: Vec<Value>) -> Value {
        let mut unique: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Value::Set(unique)
    }

    /// Build a map value; a later duplicate key replaces the earlier
    /// entry in place.
    pub fn map_of(entries: Vec<(Value, Value)>) -> Value {
        let mut unique: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if let Some(slot) = unique.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
            } else {
                unique.push((key, value));
            }
        }
        Value::Map(unique)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(v)
    }
}

impl From<MessageValue> for Value {
    fn from(v: MessageValue) -> Self {
        Self::Message(v)
    }
}
