// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime type descriptors.
//!
//! Descriptors are the immutable metadata graph every serializer walks:
//! structs, unions, exceptions, enums, containers and primitives, plus
//! the [`Program`] unit that owns the declarations of one IDL source
//! file. They are created once by the [`TypeLoader`](crate::loader::TypeLoader)
//! and shared read-only (`Arc`) for the remainder of the process.
//!
//! Encoding is dispatched purely from this model at runtime: a codec
//! matches on [`FieldType`] and recurses, without any per-generated-type
//! branch.

mod enums;
mod message;
mod program;

pub use enums::{EnumDescriptor, EnumValue};
pub use message::{
    FieldDescriptor, MessageDescriptor, MessageRef, MessageVariant, Requiredness,
    MAX_COMPACT_FIELDS,
};
pub use program::{
    ConstDescriptor, MethodDescriptor, Program, ServiceDescriptor, TypedefDescriptor,
};

/// Closed set of field types a descriptor can carry.
///
/// Message-typed fields go through [`MessageRef`] so mutually recursive
/// structs are representable without ownership cycles in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Service method return only; never a struct field on the wire.
    Void,
    Bool,
    /// Signed 8-bit integer (`byte` in IDL).
    Byte,
    I16,
    I32,
    I64,
    Double,
    /// UTF-8 string.
    Str,
    /// Raw byte blob.
    Binary,
    Enum(std::sync::Arc<EnumDescriptor>),
    /// Struct, union or exception, resolved lazily.
    Message(MessageRef),
    List(Box<FieldType>),
    Set(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
}

impl FieldType {
    /// Short type name used in diagnostics, e.g. `map<i32,string>`.
    pub fn name(&self) -> String {
        match self {
            Self::Void => "void".into(),
            Self::Bool => "bool".into(),
            Self::Byte => "byte".into(),
            Self::I16 => "i16".into(),
            Self::I32 => "i32".into(),
            Self::I64 => "i64".into(),
            Self::Double => "double".into(),
            Self::Str => "string".into(),
            Self::Binary => "binary".into(),
            Self::Enum(e) => e.qualified_name().into(),
            Self::Message(m) => m.qualified_name().into(),
            Self::List(item) => format!("list<{}>", item.name()),
            Self::Set(item) => format!("set<{}>", item.name()),
            Self::Map(key, value) => format!("map<{},{}>", key.name(), value.name()),
        }
    }

    /// Whether values of this type compare by structure (map/set key use).
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Self::Message(_) | Self::List(_) | Self::Set(_) | Self::Map(..)
        )
    }
}

/// Parsed constant literal, used for `const` declarations and field
/// default values. Identifier references (e.g. enum values) stay
/// symbolic until a consumer resolves them.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    /// Unresolved identifier, typically `Program.Enum.VALUE`.
    Identifier(String),
    List(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_names() {
        assert_eq!(FieldType::I32.name(), "i32");
        assert_eq!(FieldType::List(Box::new(FieldType::Str)).name(), "list<string>");
        assert_eq!(
            FieldType::Map(Box::new(FieldType::I16), Box::new(FieldType::Binary)).name(),
            "map<i16,binary>"
        );
    }

    #[test]
    fn containers_are_not_primitive() {
        assert!(FieldType::Double.is_primitive());
        assert!(!FieldType::Set(Box::new(FieldType::I32)).is_primitive());
    }
}
