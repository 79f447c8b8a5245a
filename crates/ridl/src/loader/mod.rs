// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recursive program loading and name resolution.
//!
//! [`TypeLoader`] turns IDL source files into fully bound [`Program`]
//! descriptors. Loading runs in three phases per file: parse, bind
//! (enums and typedefs first, then messages with lazily sealed
//! references, then services) and seal. Programs are cached by
//! canonical path, so every consumer of a type sees the same
//! descriptor instance.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptor::{
    ConstDescriptor, EnumDescriptor, EnumValue, FieldDescriptor, FieldType, MessageDescriptor,
    MessageRef, MethodDescriptor, Program, ServiceDescriptor, TypedefDescriptor,
};
use crate::idl::{self, ast, ParseError};

/// Loading or binding a program failed.
#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: ParseError,
    },
    /// The source path has no usable file stem to name the program.
    BadSourcePath { path: PathBuf },
    IncludeNotFound { include: String, from: PathBuf },
    UnknownType { name: String, program: String },
    /// Two declarations in one program share a name.
    DuplicateName { name: String, program: String },
    DuplicateFieldId { message: String, id: i16 },
    DuplicateFieldName { message: String, name: String },
    DuplicateEnumValue { enum_name: String, value: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "failed to read {}: {}", path.display(), source),
            Self::Parse { path, source } => {
                write!(f, "failed to parse {}:\n{}", path.display(), source)
            }
            Self::BadSourcePath { path } => {
                write!(f, "cannot derive a program name from {}", path.display())
            }
            Self::IncludeNotFound { include, from } => write!(
                f,
                "include \"{}\" from {} not found",
                include,
                from.display()
            ),
            Self::UnknownType { name, program } => {
                write!(f, "unknown type {} referenced in program {}", name, program)
            }
            Self::DuplicateName { name, program } => {
                write!(f, "duplicate declaration {} in program {}", name, program)
            }
            Self::DuplicateFieldId { message, id } => {
                write!(f, "duplicate field id {} in {}", id, message)
            }
            Self::DuplicateFieldName { message, name } => {
                write!(f, "duplicate field name '{}' in {}", name, message)
            }
            Self::DuplicateEnumValue { enum_name, value } => {
                write!(f, "duplicate value {} in enum {}", value, enum_name)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Default)]
struct State {
    /// Canonical source path to fully loaded program.
    cache: HashMap<PathBuf, Arc<Program>>,
    /// Paths currently being loaded. A re-included in-progress path is
    /// treated as already visited, so mutual includes terminate.
    in_progress: HashSet<PathBuf>,
    /// Qualified names referenced into still-in-progress programs,
    /// sealed once the outermost load's include graph is complete.
    pending: HashMap<String, MessageRef>,
}

/// Loads and caches programs. Cheap to share behind an `Arc`; the
/// internal lock covers the whole load of a file and its includes, so
/// concurrent loads of the same path resolve to one instance.
pub struct TypeLoader {
    include_dirs: Vec<PathBuf>,
    state: Mutex<State>,
}

impl Default for TypeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeLoader {
    pub fn new() -> Self {
        Self::with_include_dirs(Vec::new())
    }

    /// Includes are resolved against the including file's directory
    /// first, then against these directories in order.
    pub fn with_include_dirs(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            include_dirs,
            state: Mutex::new(State::default()),
        }
    }

    /// Load a program and everything it includes. A second load of the
    /// same canonical path returns the cached instance. Failed loads
    /// cache nothing.
    pub fn load(&self, path: &Path) -> Result<Arc<Program>, LoadError> {
        let canonical = fs::canonicalize(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut state = self.state.lock();
        let cached_before: HashSet<PathBuf> = state.cache.keys().cloned().collect();
        let result = self.load_locked(&canonical, &mut state);
        // References deferred across mutual includes are sealed once
        // the whole include graph is in the cache. Cells escaping a
        // failed load stay unresolved.
        let pending = std::mem::take(&mut state.pending);
        let program = result?;
        for (qualified, cell) in &pending {
            let target = qualified.split_once('.').and_then(|(prog, local)| {
                state
                    .cache
                    .values()
                    .find(|p| p.name() == prog)
                    .and_then(|p| p.message(local))
                    .cloned()
            });
            match target {
                Some(desc) => cell.seal(desc),
                None => {
                    // A dangling reference surfaces only here; drop
                    // everything this call cached so a retry starts
                    // clean.
                    state.cache.retain(|path, _| cached_before.contains(path));
                    return Err(LoadError::UnknownType {
                        name: qualified.clone(),
                        program: program.name().to_string(),
                    });
                }
            }
        }
        Ok(program)
    }

    /// All programs loaded so far, in no particular order.
    pub fn programs(&self) -> Vec<Arc<Program>> {
        self.state.lock().cache.values().cloned().collect()
    }

    fn load_locked(
        &self,
        path: &Path,
        state: &mut State,
    ) -> Result<Arc<Program>, LoadError> {
        if let Some(program) = state.cache.get(path) {
            return Ok(program.clone());
        }
        state.in_progress.insert(path.to_path_buf());
        let result = self.load_uncached(path, state);
        state.in_progress.remove(path);
        let program = result?;
        state.cache.insert(path.to_path_buf(), program.clone());
        Ok(program)
    }

    fn load_uncached(
        &self,
        path: &Path,
        state: &mut State,
    ) -> Result<Arc<Program>, LoadError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| LoadError::BadSourcePath {
                path: path.to_path_buf(),
            })?;
        log::debug!("[TypeLoader::load] loading program '{}' from {}", name, path.display());
        let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = idl::parse(&source, &name).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut includes = HashMap::new();
        let mut include_names = Vec::new();
        let mut deferred = HashSet::new();
        for include in &raw.includes {
            let file = self.resolve_include(include, path)?;
            if state.in_progress.contains(&file) {
                // Mutual include: the other file is higher up this same
                // load. Its message types bind through pending refs.
                let included_name = file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| LoadError::BadSourcePath { path: file.clone() })?;
                log::debug!(
                    "[TypeLoader::load] deferring mutual include '{}' from '{}'",
                    included_name,
                    name
                );
                include_names.push(included_name.clone());
                deferred.insert(included_name);
                continue;
            }
            let program = self.load_locked(&file, state)?;
            include_names.push(program.name().to_string());
            includes.insert(program.name().to_string(), program);
        }

        bind(
            raw,
            path.to_path_buf(),
            include_names,
            &includes,
            &deferred,
            &mut state.pending,
        )
    }

    fn resolve_include(&self, include: &str, from: &Path) -> Result<PathBuf, LoadError> {
        let mut candidates = Vec::new();
        if let Some(dir) = from.parent() {
            candidates.push(dir.join(include));
        }
        for dir in &self.include_dirs {
            candidates.push(dir.join(include));
        }
        for candidate in candidates {
            if candidate.is_file() {
                return fs::canonicalize(&candidate).map_err(|source| LoadError::Io {
                    path: candidate,
                    source,
                });
            }
        }
        Err(LoadError::IncludeNotFound {
            include: include.to_string(),
            from: from.to_path_buf(),
        })
    }
}

/// Name-resolution scope for one program being bound.
struct Binder<'a> {
    program: &'a str,
    includes: &'a HashMap<String, Arc<Program>>,
    /// Included program names whose load is still in progress above us.
    deferred: &'a HashSet<String>,
    /// Loader-wide cells for references into in-progress programs.
    pending: &'a mut HashMap<String, MessageRef>,
    enums: HashMap<String, Arc<EnumDescriptor>>,
    typedefs: HashMap<String, FieldType>,
    message_names: HashSet<String>,
    /// Shared unresolved cells for local message references, sealed
    /// after every local message descriptor exists.
    refs: HashMap<String, MessageRef>,
}

impl<'a> Binder<'a> {
    fn resolve(&mut self, raw: &ast::RawType) -> Result<FieldType, LoadError> {
        match raw {
            ast::RawType::Void => Ok(FieldType::Void),
            ast::RawType::Bool => Ok(FieldType::Bool),
            ast::RawType::Byte => Ok(FieldType::Byte),
            ast::RawType::I16 => Ok(FieldType::I16),
            ast::RawType::I32 => Ok(FieldType::I32),
            ast::RawType::I64 => Ok(FieldType::I64),
            ast::RawType::Double => Ok(FieldType::Double),
            ast::RawType::Str => Ok(FieldType::Str),
            ast::RawType::Binary => Ok(FieldType::Binary),
            ast::RawType::List(item) => Ok(FieldType::List(Box::new(self.resolve(item)?))),
            ast::RawType::Set(item) => Ok(FieldType::Set(Box::new(self.resolve(item)?))),
            ast::RawType::Map(key, value) => Ok(FieldType::Map(
                Box::new(self.resolve(key)?),
                Box::new(self.resolve(value)?),
            )),
            ast::RawType::Named(name) => self.resolve_named(name),
        }
    }

    fn resolve_named(&mut self, name: &str) -> Result<FieldType, LoadError> {
        if let Some((prog, local)) = name.split_once('.') {
            if prog != self.program {
                return self.resolve_included(prog, local, name);
            }
            return self.resolve_local(local);
        }
        self.resolve_local(name)
    }

    fn resolve_local(&mut self, name: &str) -> Result<FieldType, LoadError> {
        if let Some(target) = self.typedefs.get(name) {
            return Ok(target.clone());
        }
        if let Some(desc) = self.enums.get(name) {
            return Ok(FieldType::Enum(desc.clone()));
        }
        if self.message_names.contains(name) {
            let program = self.program;
            let cell = self
                .refs
                .entry(name.to_string())
                .or_insert_with(|| MessageRef::unresolved(format!("{}.{}", program, name)));
            return Ok(FieldType::Message(cell.clone()));
        }
        Err(LoadError::UnknownType {
            name: name.to_string(),
            program: self.program.to_string(),
        })
    }

    fn resolve_included(
        &mut self,
        prog: &str,
        local: &str,
        full: &str,
    ) -> Result<FieldType, LoadError> {
        let Some(included) = self.includes.get(prog) else {
            if self.deferred.contains(prog) {
                // The other side of a mutual include; only message
                // types can cross it, sealed at the outermost load.
                let cell = self
                    .pending
                    .entry(full.to_string())
                    .or_insert_with(|| MessageRef::unresolved(full));
                return Ok(FieldType::Message(cell.clone()));
            }
            return Err(LoadError::UnknownType {
                name: full.to_string(),
                program: self.program.to_string(),
            });
        };
        if let Some(desc) = included.enum_type(local) {
            return Ok(FieldType::Enum(desc.clone()));
        }
        if let Some(desc) = included.message(local) {
            // Included programs are complete, so the reference is
            // sealed immediately.
            return Ok(FieldType::Message(MessageRef::resolved(desc.clone())));
        }
        if let Some(td) = included.typedef(local) {
            return Ok(td.target.clone());
        }
        Err(LoadError::UnknownType {
            name: full.to_string(),
            program: self.program.to_string(),
        })
    }

    fn bind_fields(
        &mut self,
        message: &str,
        raw_fields: &[ast::RawField],
    ) -> Result<Vec<FieldDescriptor>, LoadError> {
        let qualified = format!("{}.{}", self.program, message);
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        let mut fields = Vec::with_capacity(raw_fields.len());
        for raw in raw_fields {
            if !ids.insert(raw.id) {
                return Err(LoadError::DuplicateFieldId {
                    message: qualified,
                    id: raw.id,
                });
            }
            if !names.insert(raw.name.clone()) {
                return Err(LoadError::DuplicateFieldName {
                    message: qualified,
                    name: raw.name.clone(),
                });
            }
            let mut field = FieldDescriptor::new(raw.id, raw.name.clone(), self.resolve(&raw.field_type)?)
                .with_requiredness(raw.requiredness);
            if let Some(default) = &raw.default {
                field = field.with_default(default.clone());
            }
            fields.push(field);
        }
        Ok(fields)
    }
}

fn bind(
    raw: ast::RawProgram,
    path: PathBuf,
    include_names: Vec<String>,
    includes: &HashMap<String, Arc<Program>>,
    deferred: &HashSet<String>,
    pending: &mut HashMap<String, MessageRef>,
) -> Result<Arc<Program>, LoadError> {
    let mut seen = HashSet::new();
    for decl in &raw.decls {
        if !seen.insert(decl.name().to_string()) {
            return Err(LoadError::DuplicateName {
                name: decl.name().to_string(),
                program: raw.name.clone(),
            });
        }
    }

    let mut binder = Binder {
        program: &raw.name,
        includes,
        deferred,
        pending,
        enums: HashMap::new(),
        typedefs: HashMap::new(),
        message_names: raw
            .decls
            .iter()
            .filter_map(|d| match d {
                ast::RawDecl::Message(m) => Some(m.name.clone()),
                _ => None,
            })
            .collect(),
        refs: HashMap::new(),
    };

    // Enums carry no type references, bind them first.
    let mut enums = Vec::new();
    for decl in &raw.decls {
        if let ast::RawDecl::Enum(raw_enum) = decl {
            let mut ids = HashSet::new();
            let mut names = HashSet::new();
            for (name, id) in &raw_enum.values {
                if !ids.insert(*id) {
                    return Err(LoadError::DuplicateEnumValue {
                        enum_name: format!("{}.{}", raw.name, raw_enum.name),
                        value: id.to_string(),
                    });
                }
                if !names.insert(name.clone()) {
                    return Err(LoadError::DuplicateEnumValue {
                        enum_name: format!("{}.{}", raw.name, raw_enum.name),
                        value: name.clone(),
                    });
                }
            }
            let desc = Arc::new(EnumDescriptor::new(
                raw.name.clone(),
                raw_enum.name.clone(),
                raw_enum
                    .values
                    .iter()
                    .map(|(name, id)| EnumValue::new(*id, name.clone()))
                    .collect(),
            ));
            binder.enums.insert(raw_enum.name.clone(), desc.clone());
            enums.push(desc);
        }
    }

    // Typedefs resolve in declaration order; a typedef may alias any
    // enum, message or earlier typedef.
    let mut typedefs = Vec::new();
    for decl in &raw.decls {
        if let ast::RawDecl::Typedef(raw_td) = decl {
            let target = binder.resolve(&raw_td.target)?;
            binder.typedefs.insert(raw_td.name.clone(), target.clone());
            typedefs.push(TypedefDescriptor {
                name: raw_td.name.clone(),
                target,
            });
        }
    }

    let mut constants = Vec::new();
    for decl in &raw.decls {
        if let ast::RawDecl::Const(raw_const) = decl {
            constants.push(ConstDescriptor {
                name: raw_const.name.clone(),
                value_type: binder.resolve(&raw_const.value_type)?,
                value: raw_const.value.clone(),
            });
        }
    }

    let mut messages = Vec::new();
    for decl in &raw.decls {
        if let ast::RawDecl::Message(raw_msg) = decl {
            let fields = binder.bind_fields(&raw_msg.name, &raw_msg.fields)?;
            let mut desc = MessageDescriptor::new(
                raw.name.clone(),
                raw_msg.name.clone(),
                raw_msg.variant,
                fields,
            );
            if raw_msg.annotations.iter().any(|(k, _)| k == "json.compact") {
                desc = desc.with_json_compact();
            }
            messages.push(Arc::new(desc));
        }
    }

    let mut services = Vec::new();
    for decl in &raw.decls {
        if let ast::RawDecl::Service(raw_service) = decl {
            let mut methods = Vec::with_capacity(raw_service.methods.len());
            for raw_method in &raw_service.methods {
                let returns = match binder.resolve(&raw_method.returns)? {
                    FieldType::Void => None,
                    other => Some(other),
                };
                methods.push(MethodDescriptor {
                    name: raw_method.name.clone(),
                    oneway: raw_method.oneway,
                    returns,
                    params: binder.bind_fields(&raw_method.name, &raw_method.params)?,
                    throws: binder.bind_fields(&raw_method.name, &raw_method.throws)?,
                });
            }
            services.push(ServiceDescriptor {
                name: raw_service.name.clone(),
                program: raw.name.clone(),
                extends: raw_service.extends.clone(),
                methods,
            });
        }
    }

    // Seal pass: every local reference cell points at its descriptor.
    // Resolution already rejected unknown names, so each cell has a
    // target here.
    for (name, cell) in &binder.refs {
        if let Some(desc) = messages.iter().find(|m| m.name() == name.as_str()) {
            cell.seal(desc.clone());
        }
    }

    log::debug!(
        "[TypeLoader::load] bound program '{}': {} messages, {} enums, {} services",
        raw.name,
        messages.len(),
        enums.len(),
        services.len()
    );

    Ok(Arc::new(Program::new(
        raw.name,
        path,
        include_names,
        messages,
        enums,
        typedefs,
        services,
        constants,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_and_caches_by_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "cal.ridl",
            r#"
            enum Weekday { MONDAY, TUESDAY }
            struct Event {
              1: required string title;
              2: Weekday day;
            }
            "#,
        );
        let loader = TypeLoader::new();
        let first = loader.load(&path).unwrap();
        let second = loader.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let event = first.message("Event").unwrap();
        assert_eq!(event.qualified_name(), "cal.Event");
        assert!(matches!(
            &event.field_by_id(2).unwrap().field_type,
            FieldType::Enum(e) if e.name() == "Weekday"
        ));
    }

    #[test]
    fn recursive_type_is_sealed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "tree.ridl",
            r#"
            struct Node {
              1: i32 value;
              2: list<Node> children;
            }
            "#,
        );
        let program = TypeLoader::new().load(&path).unwrap();
        let node = program.message("Node").unwrap();
        match &node.field_by_id(2).unwrap().field_type {
            FieldType::List(inner) => match inner.as_ref() {
                FieldType::Message(r) => {
                    assert!(r.is_sealed());
                    assert!(Arc::ptr_eq(&r.get().unwrap(), node));
                }
                other => panic!("expected message element, got {}", other.name()),
            },
            other => panic!("expected list, got {}", other.name()),
        }
    }

    #[test]
    fn includes_resolve_and_share_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "base.ridl",
            "struct Id { 1: i64 value; }\n",
        );
        let a = write_file(
            dir.path(),
            "a.ridl",
            "include \"base.ridl\"\nstruct A { 1: base.Id id; }\n",
        );
        let b = write_file(
            dir.path(),
            "b.ridl",
            "include \"base.ridl\"\nstruct B { 1: base.Id id; }\n",
        );
        let loader = TypeLoader::new();
        let prog_a = loader.load(&a).unwrap();
        let prog_b = loader.load(&b).unwrap();

        let id_a = match &prog_a.message("A").unwrap().field_by_id(1).unwrap().field_type {
            FieldType::Message(r) => r.get().unwrap(),
            other => panic!("expected message, got {}", other.name()),
        };
        let id_b = match &prog_b.message("B").unwrap().field_by_id(1).unwrap().field_type {
            FieldType::Message(r) => r.get().unwrap(),
            other => panic!("expected message, got {}", other.name()),
        };
        // Both programs see the one cached base.Id instance.
        assert!(Arc::ptr_eq(&id_a, &id_b));
        assert_eq!(loader.programs().len(), 3);
    }

    #[test]
    fn mutual_includes_load_once_each() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(
            dir.path(),
            "a.ridl",
            "include \"b.ridl\"\nstruct A { 1: optional b.B sibling; 2: i32 v; }\n",
        );
        let b = write_file(
            dir.path(),
            "b.ridl",
            "include \"a.ridl\"\nstruct B { 1: optional a.A sibling; 2: i32 v; }\n",
        );
        let loader = TypeLoader::new();
        let prog_a = loader.load(&a).unwrap();
        assert_eq!(loader.programs().len(), 2);
        // The second path was already loaded as part of the first.
        let prog_b = loader.load(&b).unwrap();
        assert_eq!(loader.programs().len(), 2);

        let a_in_b = match &prog_b.message("B").unwrap().field_by_id(1).unwrap().field_type {
            FieldType::Message(r) => r,
            other => panic!("expected message, got {}", other.name()),
        };
        assert!(a_in_b.is_sealed());
        assert!(Arc::ptr_eq(
            &a_in_b.get().unwrap(),
            prog_a.message("A").unwrap()
        ));
        let b_in_a = match &prog_a.message("A").unwrap().field_by_id(1).unwrap().field_type {
            FieldType::Message(r) => r,
            other => panic!("expected message, got {}", other.name()),
        };
        assert!(Arc::ptr_eq(
            &b_in_a.get().unwrap(),
            prog_b.message("B").unwrap()
        ));
    }

    #[test]
    fn dangling_mutual_reference_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(
            dir.path(),
            "a.ridl",
            "include \"b.ridl\"\nstruct A { 1: b.B sibling; }\n",
        );
        write_file(
            dir.path(),
            "b.ridl",
            "include \"a.ridl\"\nstruct B { 1: a.Missing nope; }\n",
        );
        assert!(matches!(
            TypeLoader::new().load(&a),
            Err(LoadError::UnknownType { name, .. }) if name == "a.Missing"
        ));
    }

    #[test]
    fn duplicate_field_id_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "dup.ridl",
            "struct S { 1: i32 a; 1: i32 b; }\n",
        );
        assert!(matches!(
            TypeLoader::new().load(&path),
            Err(LoadError::DuplicateFieldId { id: 1, .. })
        ));
    }

    #[test]
    fn duplicate_enum_value_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "dup.ridl",
            "enum E { A = 1, B = 1 }\n",
        );
        assert!(matches!(
            TypeLoader::new().load(&path),
            Err(LoadError::DuplicateEnumValue { .. })
        ));
    }

    #[test]
    fn failed_load_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "late.ridl", "struct Broken {\n");
        let loader = TypeLoader::new();
        assert!(matches!(
            loader.load(&path),
            Err(LoadError::Parse { .. })
        ));
        write_file(dir.path(), "late.ridl", "struct Fixed { 1: i32 v; }\n");
        let program = loader.load(&path).unwrap();
        assert!(program.message("Fixed").is_some());
    }

    #[test]
    fn unknown_type_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "bad.ridl",
            "struct S { 1: Missing m; }\n",
        );
        assert!(matches!(
            TypeLoader::new().load(&path),
            Err(LoadError::UnknownType { name, .. }) if name == "Missing"
        ));
    }

    #[test]
    fn include_dirs_are_searched() {
        let shared = tempfile::tempdir().unwrap();
        write_file(shared.path(), "common.ridl", "enum Kind { A, B }\n");
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "main.ridl",
            "include \"common.ridl\"\nstruct S { 1: common.Kind kind; }\n",
        );
        let loader = TypeLoader::with_include_dirs(vec![shared.path().to_path_buf()]);
        let program = loader.load(&path).unwrap();
        assert!(matches!(
            &program.message("S").unwrap().field_by_id(1).unwrap().field_type,
            FieldType::Enum(e) if e.qualified_name() == "common.Kind"
        ));
    }
}
