// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct, union and exception descriptors.

use crate::descriptor::{ConstValue, FieldType};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Which flavor of message a descriptor declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVariant {
    Struct,
    /// Exactly one field may be set on an instance.
    Union,
    Exception,
}

/// Field requiredness tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requiredness {
    Required,
    Optional,
    /// No modifier in the IDL: optional on the wire, present in hashCode
    /// semantics of the original model.
    #[default]
    Default,
}

/// A single field of a struct, union or exception.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Unique within the declaring message. Signed 16-bit on the wire.
    pub id: i16,
    pub name: String,
    pub requiredness: Requiredness,
    pub field_type: FieldType,
    /// Default value literal from the IDL, if declared.
    pub default: Option<ConstValue>,
}

impl FieldDescriptor {
    pub fn new(id: i16, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id,
            name: name.into(),
            requiredness: Requiredness::Default,
            field_type,
            default: None,
        }
    }

    pub fn with_requiredness(mut self, requiredness: Requiredness) -> Self {
        self.requiredness = requiredness;
        self
    }

    pub fn with_default(mut self, default: ConstValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// Descriptor for a struct, union or exception declaration.
#[derive(Debug)]
pub struct MessageDescriptor {
    name: String,
    program: String,
    variant: MessageVariant,
    fields: Vec<FieldDescriptor>,
    json_compact: bool,
}

impl MessageDescriptor {
    pub fn new(
        program: impl Into<String>,
        name: impl Into<String>,
        variant: MessageVariant,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            variant,
            fields,
            json_compact: false,
        }
    }

    /// Opt the descriptor in to the positional compact-array JSON form.
    pub fn with_json_compact(mut self) -> Self {
        self.json_compact = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `program.Name` form.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.program, self.name)
    }

    pub fn variant(&self) -> MessageVariant {
        self.variant
    }

    pub fn is_union(&self) -> bool {
        self.variant == MessageVariant::Union
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_by_id(&self, id: i16) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the compact-array JSON form may be used for instances.
    ///
    /// The annotation alone is not enough: the positional layout is
    /// only well-defined when declaration order and id order coincide.
    /// The annotation is honored for structs with at most
    /// [`MAX_COMPACT_FIELDS`] fields whose ids are exactly `1..=N` in
    /// declaration order, with every required field preceding the
    /// first optional one.
    pub fn is_json_compactible(&self) -> bool {
        if !self.json_compact
            || self.variant != MessageVariant::Struct
            || self.fields.len() > MAX_COMPACT_FIELDS
        {
            return false;
        }
        let mut seen_optional = false;
        for (index, field) in self.fields.iter().enumerate() {
            if usize::try_from(field.id) != Ok(index + 1) {
                return false;
            }
            let required = field.requiredness == Requiredness::Required;
            if seen_optional && required {
                return false;
            }
            seen_optional |= !required;
        }
        true
    }
}

/// Cap on the positional compact-array JSON form.
pub const MAX_COMPACT_FIELDS: usize = 10;

// Equality by identity-relevant structure, not by field recursion:
// descriptors are unique per qualified name within a loaded graph, and
// recursive field types would not terminate under deep comparison.
impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.program == other.program && self.variant == other.variant
    }
}

/// Lazily resolved reference to a [`MessageDescriptor`].
///
/// Struct fields refer to message types through this handle instead of
/// owning the descriptor directly, so `struct A { B b }` with
/// `struct B { A a }` forms no ownership cycle while being built. The
/// loader fills the cell in its seal pass, once every referenced name
/// is known to exist.
#[derive(Clone)]
pub struct MessageRef {
    qualified_name: String,
    cell: Arc<OnceLock<Arc<MessageDescriptor>>>,
}

impl MessageRef {
    /// An unresolved reference; the loader seals it later.
    pub fn unresolved(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// A reference that is already resolved, for descriptors assembled
    /// directly in code rather than loaded from IDL.
    pub fn resolved(descriptor: Arc<MessageDescriptor>) -> Self {
        let cell = OnceLock::new();
        let qualified_name = descriptor.qualified_name();
        let _ = cell.set(descriptor);
        Self {
            qualified_name,
            cell: Arc::new(cell),
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// The target descriptor; `None` only for a reference that escaped
    /// a failed load before sealing.
    pub fn get(&self) -> Option<Arc<MessageDescriptor>> {
        self.cell.get().cloned()
    }

    /// Seal the reference. The first write wins; later seals of the
    /// same target are no-ops.
    pub fn seal(&self, descriptor: Arc<MessageDescriptor>) {
        let _ = self.cell.set(descriptor);
    }

    pub fn is_sealed(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl PartialEq for MessageRef {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name == other.qualified_name
    }
}

// Manual impl: following the cell would recurse forever on cyclic types.
impl fmt::Debug for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRef")
            .field("qualified_name", &self.qualified_name)
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
