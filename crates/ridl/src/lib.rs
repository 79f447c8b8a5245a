// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # ridl - Runtime IDL data interchange
//!
//! An IDL-driven serialization framework that works entirely from
//! runtime type descriptors. Programs are parsed from Thrift-style IDL
//! files, bound into an immutable descriptor graph, and then any
//! number of wire codecs encode and decode values by walking those
//! descriptors. No code generation step is required to move data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ridl::{BinarySerializer, MessageValue, Serializer, TypeLoader};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a program and every file it includes.
//!     let loader = TypeLoader::new();
//!     let program = loader.load(Path::new("idl/calendar.ridl"))?;
//!     let event = program.message("Event").unwrap().clone();
//!
//!     // Build a value against the descriptor.
//!     let mut builder = MessageValue::builder(event.clone());
//!     builder.set_by_name("title", "standup")?;
//!     let message = builder.build()?;
//!
//!     // Encode and decode it through any codec.
//!     let mut wire = Vec::new();
//!     BinarySerializer::new().serialize(&mut wire, &message)?;
//!     let back = BinarySerializer::new().deserialize(&mut wire.as_slice(), &event)?;
//!     assert_eq!(back, message);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        IDL sources                           |
//! |        idl::parse -> RawProgram (unresolved names)           |
//! +--------------------------------------------------------------+
//! |                        TypeLoader                            |
//! |   include graph | name binding | seal pass | identity cache  |
//! +--------------------------------------------------------------+
//! |                     Descriptor graph                         |
//! |   Program -> MessageDescriptor / EnumDescriptor / services   |
//! +--------------------------------------------------------------+
//! |                  Values and wire codecs                      |
//! |   MessageValue | binary | fast binary | json | framed        |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeLoader`] | Loads IDL files into cached, fully bound programs |
//! | [`Program`] | Everything one IDL source file declares |
//! | [`MessageDescriptor`] | Runtime metadata for a struct, union or exception |
//! | [`MessageValue`] | Immutable message instance keyed by field id |
//! | [`Serializer`] | Object-safe codec trait over the value model |
//!
//! ## Modules Overview
//!
//! - [`idl`] - Lexer, parser and unresolved syntax tree
//! - [`loader`] - Recursive loading, binding and caching
//! - [`descriptor`] - The immutable runtime type model
//! - [`value`] - Values, builders and validation
//! - [`ser`] - Wire codecs and the framed transport

pub mod descriptor;
pub mod idl;
pub mod loader;
pub mod ser;
pub mod value;

pub use descriptor::{
    EnumDescriptor, FieldDescriptor, FieldType, MessageDescriptor, MessageRef, MessageVariant,
    Program, Requiredness,
};
pub use loader::{LoadError, TypeLoader};
pub use ser::{
    BinarySerializer, FastBinarySerializer, FrameReader, FrameWriter, JsonSerializer,
    SerializeError, Serializer,
};
pub use value::{MessageBuilder, MessageValue, ValidationError, Value};
