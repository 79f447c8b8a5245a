// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enum descriptors.

/// A named integer constant within an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub id: i32,
    pub name: String,
}

impl EnumValue {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Descriptor for an IDL `enum` declaration.
///
/// Values are immutable once loaded; both the id axis and the name axis
/// are unique (enforced by the loader). Lookups scan the fixed small
/// value list and return `None` on a miss.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    name: String,
    program: String,
    values: Vec<EnumValue>,
}

impl EnumDescriptor {
    pub fn new(program: impl Into<String>, name: impl Into<String>, values: Vec<EnumValue>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            values,
        }
    }

    /// Local type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the declaring program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// `program.Name` form used in diagnostics and rendering.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.program, self.name)
    }

    /// Declared values in declaration order.
    pub fn values(&self) -> &[EnumValue] {
        &self.values
    }

    pub fn value_by_id(&self, id: i32) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.id == id)
    }

    /// Case-insensitive name lookup.
    pub fn value_by_name(&self, name: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }
}
