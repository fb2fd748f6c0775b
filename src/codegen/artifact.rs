//! Generated artifacts and the assembled project tree.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of file the renderer produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Data-record (model) class
    Record,
    /// Schema-migration script
    Migration,
    /// Inbound request validation object
    Request,
    /// HTTP controller with list/create/show/update/delete
    Controller,
    /// Outbound resource transformer
    Resource,
    /// View-layer artifact; shape depends on the stack variant
    View,
    /// Cross-entity route registration file
    Routes,
}

impl ArtifactKind {
    /// Kinds rendered once per entity, in emission order
    pub const PER_ENTITY: [ArtifactKind; 6] = [
        ArtifactKind::Record,
        ArtifactKind::Migration,
        ArtifactKind::Request,
        ArtifactKind::Controller,
        ArtifactKind::Resource,
        ArtifactKind::View,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Record => "record",
            ArtifactKind::Migration => "migration",
            ArtifactKind::Request => "request",
            ArtifactKind::Controller => "controller",
            ArtifactKind::Resource => "resource",
            ArtifactKind::View => "view",
            ArtifactKind::Routes => "routes",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub relative_path: String,
    pub content: String,
    /// Owning entity; `None` for cross-entity files
    pub entity_id: Option<String>,
    pub kind: ArtifactKind,
}

/// Relative path → file content, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectTree {
    files: BTreeMap<String, Vec<u8>>,
}

impl ProjectTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.files.insert(path.into(), content.into())
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// File content as UTF-8 text, if present and valid
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of all file sizes in bytes
    pub fn total_bytes(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Size of the largest file in bytes
    pub fn largest_file(&self) -> usize {
        self.files.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<u8>> {
        self.files
    }
}
