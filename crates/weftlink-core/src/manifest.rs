//! Package manifest reading, validation, and writing.
//!
//! All manifest content enters the system through [`read_manifest`]; no other
//! component accepts raw parsed JSON. Parsing is strict: a manifest whose
//! shape is wrong (non-object root, non-string name, a dependency section
//! that is not a string-to-string map) is rejected with a parse error
//! carrying the offending path.

use crate::error::CoreError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use weftlink_util::fs::atomic_write;

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// The kinds of dependency maps a manifest can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencyKind {
    Runtime,
    Dev,
    Peer,
    Optional,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::Runtime,
        DependencyKind::Dev,
        DependencyKind::Peer,
        DependencyKind::Optional,
    ];

    /// The manifest key this kind is stored under.
    #[must_use]
    pub fn manifest_key(self) -> &'static str {
        match self {
            Self::Runtime => "dependencies",
            Self::Dev => "devDependencies",
            Self::Peer => "peerDependencies",
            Self::Optional => "optionalDependencies",
        }
    }
}

/// A validated package manifest.
///
/// A manifest without a `name` cannot be a link source or scope-match target,
/// but its dependency maps are still inspected (it can be a consumer).
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub peer_dependencies: BTreeMap<String, String>,
    pub optional_dependencies: BTreeMap<String, String>,
    /// Top-level fields we don't interpret, preserved across a rewrite.
    rest: Map<String, Value>,
}

impl Manifest {
    /// The dependency map for one kind.
    #[must_use]
    pub fn section(&self, kind: DependencyKind) -> &BTreeMap<String, String> {
        match kind {
            DependencyKind::Runtime => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
            DependencyKind::Optional => &self.optional_dependencies,
        }
    }

    fn section_mut(&mut self, kind: DependencyKind) -> &mut BTreeMap<String, String> {
        match kind {
            DependencyKind::Runtime => &mut self.dependencies,
            DependencyKind::Dev => &mut self.dev_dependencies,
            DependencyKind::Peer => &mut self.peer_dependencies,
            DependencyKind::Optional => &mut self.optional_dependencies,
        }
    }

    /// Iterate every declared dependency as `(kind, name, range)`.
    pub fn iter_all(&self) -> impl Iterator<Item = (DependencyKind, &str, &str)> {
        DependencyKind::ALL.into_iter().flat_map(move |kind| {
            self.section(kind)
                .iter()
                .map(move |(name, range)| (kind, name.as_str(), range.as_str()))
        })
    }

    /// Whether any dependency map declares `name`.
    #[must_use]
    pub fn depends_on(&self, name: &str) -> bool {
        DependencyKind::ALL
            .into_iter()
            .any(|kind| self.section(kind).contains_key(name))
    }

    /// The `@scope` prefix of this package's name, if it has one.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        package_scope(self.name.as_deref()?)
    }
}

/// The `@scope` prefix of a package name (`@acme/core` -> `@acme`).
#[must_use]
pub fn package_scope(name: &str) -> Option<&str> {
    if !name.starts_with('@') {
        return None;
    }
    name.split_once('/').map(|(scope, _)| scope)
}

/// Read and validate the manifest at `path`.
pub fn read_manifest(path: &Path) -> Result<Manifest, CoreError> {
    let content = fs::read_to_string(path).map_err(|source| CoreError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;

    parse_manifest(&content).map_err(|reason| CoreError::ManifestParse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Write `manifest` to `path` atomically, with sorted keys and a trailing
/// newline.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), CoreError> {
    let value = to_value(manifest);
    let mut output = serde_json::to_string_pretty(&value).map_err(|e| CoreError::ManifestParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    output.push('\n');

    atomic_write(path, output.as_bytes()).map_err(|source| CoreError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_manifest(content: &str) -> Result<Manifest, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(format!(
                "manifest root must be an object, got {}",
                json_type_name(&other)
            ))
        }
    };

    let mut manifest = Manifest {
        name: take_string(&mut map, "name")?,
        version: take_string(&mut map, "version")?,
        ..Manifest::default()
    };

    for kind in DependencyKind::ALL {
        let key = kind.manifest_key();
        if let Some(section) = map.remove(key) {
            *manifest.section_mut(kind) = parse_section(key, &section)?;
        }
    }

    manifest.rest = map;
    Ok(manifest)
}

fn to_value(manifest: &Manifest) -> Value {
    // serde_json's Map keeps keys sorted, which gives deterministic output.
    let mut map = manifest.rest.clone();

    if let Some(name) = &manifest.name {
        map.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(version) = &manifest.version {
        map.insert("version".into(), Value::String(version.clone()));
    }

    for kind in DependencyKind::ALL {
        let section = manifest.section(kind);
        if !section.is_empty() {
            let entries: Map<String, Value> = section
                .iter()
                .map(|(name, range)| (name.clone(), Value::String(range.clone())))
                .collect();
            map.insert(kind.manifest_key().into(), Value::Object(entries));
        }
    }

    Value::Object(map)
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match map.remove(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(format!(
            "'{key}' must be a string, got {}",
            json_type_name(&other)
        )),
    }
}

fn parse_section(key: &str, section: &Value) -> Result<BTreeMap<String, String>, String> {
    let Some(entries) = section.as_object() else {
        return Err(format!(
            "'{key}' must be an object, got {}",
            json_type_name(section)
        ));
    };

    let mut out = BTreeMap::new();
    for (name, range) in entries {
        let Some(range) = range.as_str() else {
            return Err(format!(
                "'{key}.{name}' must be a string, got {}",
                json_type_name(range)
            ));
        };
        out.insert(name.clone(), range.to_string());
    }
    Ok(out)
}

/// Human-readable type name for a JSON value.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
