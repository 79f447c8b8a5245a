// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The program unit: everything declared by one IDL source file.

use crate::descriptor::{ConstValue, EnumDescriptor, FieldDescriptor, FieldType, MessageDescriptor};
use std::path::PathBuf;
use std::sync::Arc;

/// A `typedef` declaration, with the alias target already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedefDescriptor {
    pub name: String,
    pub target: FieldType,
}

/// A `const` declaration. Codecs never consume these; they are kept for
/// generators and tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDescriptor {
    pub name: String,
    pub value_type: FieldType,
    pub value: ConstValue,
}

/// One method of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub oneway: bool,
    /// `None` for `void` methods.
    pub returns: Option<FieldType>,
    /// Request parameters, field-id keyed like a struct.
    pub params: Vec<FieldDescriptor>,
    /// Declared `throws` exceptions.
    pub throws: Vec<FieldDescriptor>,
}

/// A `service` declaration. Descriptors only; no transport binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub program: String,
    /// Qualified name of the extended service, if any.
    pub extends: Option<String>,
    pub methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.program, self.name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A fully loaded and resolved program.
///
/// Declaration order equals source order for every category, which is
/// the iteration-order guarantee generators rely on. Includes are
/// back-references by program name; the owning [`TypeLoader`]
/// (crate::loader::TypeLoader) holds the actual included programs.
#[derive(Debug)]
pub struct Program {
    name: String,
    path: PathBuf,
    includes: Vec<String>,
    messages: Vec<Arc<MessageDescriptor>>,
    enums: Vec<Arc<EnumDescriptor>>,
    typedefs: Vec<TypedefDescriptor>,
    services: Vec<ServiceDescriptor>,
    constants: Vec<ConstDescriptor>,
}

impl Program {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        path: PathBuf,
        includes: Vec<String>,
        messages: Vec<Arc<MessageDescriptor>>,
        enums: Vec<Arc<EnumDescriptor>>,
        typedefs: Vec<TypedefDescriptor>,
        services: Vec<ServiceDescriptor>,
        constants: Vec<ConstDescriptor>,
    ) -> Self {
        Self {
            name,
            path,
            includes,
            messages,
            enums,
            typedefs,
            services,
            constants,
        }
    }

    /// Program name, derived from the source file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical path of the source file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Names of directly included programs.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn messages(&self) -> &[Arc<MessageDescriptor>] {
        &self.messages
    }

    pub fn enums(&self) -> &[Arc<EnumDescriptor>] {
        &self.enums
    }

    pub fn typedefs(&self) -> &[TypedefDescriptor] {
        &self.typedefs
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn constants(&self) -> &[ConstDescriptor] {
        &self.constants
    }

    pub fn message(&self, name: &str) -> Option<&Arc<MessageDescriptor>> {
        self.messages.iter().find(|m| m.name() == name)
    }

    pub fn enum_type(&self, name: &str) -> Option<&Arc<EnumDescriptor>> {
        self.enums.iter().find(|e| e.name() == name)
    }

    pub fn typedef(&self, name: &str) -> Option<&TypedefDescriptor> {
        self.typedefs.iter().find(|t| t.name == name)
    }
}
