// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unresolved syntax tree.
//!
//! Everything here references other types purely by name string; the
//! loader binds names to descriptors after the include graph is read.

use crate::descriptor::{ConstValue, MessageVariant, Requiredness};

/// One parsed IDL source file, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProgram {
    /// Program name, from the source file stem.
    pub name: String,
    /// Relative include paths, as written.
    pub includes: Vec<String>,
    /// `(target-language, namespace)` pairs.
    pub namespaces: Vec<(String, String)>,
    /// Declarations in source order.
    pub decls: Vec<RawDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawDecl {
    Enum(RawEnum),
    Message(RawMessage),
    Typedef(RawTypedef),
    Const(RawConst),
    Service(RawService),
}

impl RawDecl {
    pub fn name(&self) -> &str {
        match self {
            Self::Enum(e) => &e.name,
            Self::Message(m) => &m.name,
            Self::Typedef(t) => &t.name,
            Self::Const(c) => &c.name,
            Self::Service(s) => &s.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEnum {
    pub name: String,
    /// `(name, explicit value)`; implicit values are assigned in the
    /// parser (previous + 1, starting at 0) so the AST is always exact.
    pub values: Vec<(String, i32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub variant: MessageVariant,
    pub name: String,
    pub fields: Vec<RawField>,
    /// Trailing type annotations, e.g. `(json.compact = "")`.
    pub annotations: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub id: i16,
    pub name: String,
    pub requiredness: Requiredness,
    pub field_type: RawType,
    pub default: Option<ConstValue>,
    /// Declaration line, for load-time diagnostics.
    pub line: usize,
}

/// Type reference by shape; `Named` defers to the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawType {
    Void,
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    Str,
    Binary,
    List(Box<RawType>),
    Set(Box<RawType>),
    Map(Box<RawType>, Box<RawType>),
    /// Unqualified (`Type`) or qualified (`program.Type`) reference.
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTypedef {
    pub name: String,
    pub target: RawType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawConst {
    pub name: String,
    pub value_type: RawType,
    pub value: ConstValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawService {
    pub name: String,
    pub extends: Option<String>,
    pub methods: Vec<RawMethod>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMethod {
    pub name: String,
    pub oneway: bool,
    /// `RawType::Void` for void methods.
    pub returns: RawType,
    pub params: Vec<RawField>,
    pub throws: Vec<RawField>,
}
