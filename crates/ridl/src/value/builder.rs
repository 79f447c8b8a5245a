// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::{MessageDescriptor, Requiredness};
use crate::value::{MessageValue, Value};

/// Building or mutating a message failed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The message type has no field with this id or name.
    NoSuchField { message: String, field: String },
    /// The value's type does not match the field's declared type.
    TypeMismatch {
        message: String,
        field: String,
        expected: String,
        actual: String,
    },
    /// Required fields missing at build time.
    MissingRequired { message: String, fields: Vec<String> },
    /// A union must carry exactly one field.
    UnionFieldCount { message: String, count: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchField { message, field } => {
                write!(f, "no field '{}' in {}", field, message)
            }
            Self::TypeMismatch {
                message,
                field,
                expected,
                actual,
            } => write!(
                f,
                "field '{}' of {} expects {}, got {}",
                field, message, expected, actual
            ),
            Self::MissingRequired { message, fields } => write!(
                f,
                "missing required fields in {}: {}",
                message,
                fields.join(", ")
            ),
            Self::UnionFieldCount { message, count } => write!(
                f,
                "union {} must have exactly one field set, has {}",
                message, count
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Mutable accumulator for a [`MessageValue`].
///
/// Tracks presence per field id; `set` validates the field exists and
/// the value's type matches, `build` validates requiredness and the
/// union arity rule.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    descriptor: Arc<MessageDescriptor>,
    fields: BTreeMap<i16, Value>,
}

impl MessageBuilder {
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor,
            fields: BTreeMap::new(),
        }
    }

    pub(crate) fn seeded(
        descriptor: Arc<MessageDescriptor>,
        fields: BTreeMap<i16, Value>,
    ) -> Self {
        Self { descriptor, fields }
    }

    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Set a field by id, replacing any previous value.
    pub fn set(
        &mut self,
        field_id: i16,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ValidationError> {
        let value = value.into();
        let field = self.descriptor.field_by_id(field_id).ok_or_else(|| {
            ValidationError::NoSuchField {
                message: self.descriptor.qualified_name(),
                field: field_id.to_string(),
            }
        })?;
        if !value.matches(&field.field_type) {
            return Err(ValidationError::TypeMismatch {
                message: self.descriptor.qualified_name(),
                field: field.name.clone(),
                expected: field.field_type.name(),
                actual: value.type_name().to_string(),
            });
        }
        self.fields.insert(field_id, value);
        Ok(self)
    }

    /// Set a field by declared name.
    pub fn set_by_name(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ValidationError> {
        let field_id = self
            .descriptor
            .field_by_name(name)
            .map(|f| f.id)
            .ok_or_else(|| ValidationError::NoSuchField {
                message: self.descriptor.qualified_name(),
                field: name.to_string(),
            })?;
        self.set(field_id, value)
    }

    /// Clear a field; clearing an absent field is a no-op.
    pub fn unset(&mut self, field_id: i16) -> &mut Self {
        self.fields.remove(&field_id);
        self
    }

    pub fn has(&self, field_id: i16) -> bool {
        self.fields.contains_key(&field_id)
    }

    /// Validate and produce the immutable message.
    pub fn build(self) -> Result<MessageValue, ValidationError> {
        if self.descriptor.is_union() {
            if self.fields.len() != 1 {
                return Err(ValidationError::UnionFieldCount {
                    message: self.descriptor.qualified_name(),
                    count: self.fields.len(),
                });
            }
        } else {
            let missing: Vec<String> = self
                .descriptor
                .fields()
                .iter()
                .filter(|f| {
                    f.requiredness == Requiredness::Required && !self.fields.contains_key(&f.id)
                })
                .map(|f| f.name.clone())
                .collect();
            if !missing.is_empty() {
                return Err(ValidationError::MissingRequired {
                    message: self.descriptor.qualified_name(),
                    fields: missing,
                });
            }
        }
        Ok(MessageValue::new(self.descriptor, self.fields))
    }
}
