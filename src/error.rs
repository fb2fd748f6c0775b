//! Error types for schema validation, generation and archiving.
//!
//! Every structural error carries the entity/field/rule identifiers the editor
//! needs to point the user at the offending part of the schema.

use serde::Serialize;
use std::io;
use thiserror::Error;

use crate::codegen::artifact::ArtifactKind;
use crate::schema::{SemanticType, StackVariant};

/// Errors raised while turning a schema into a project tree.
///
/// All variants are deterministic for a given input.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Schema-level structural problem (empty entity list, duplicate ids, bad payload).
    #[error("invalid schema: {reason}")]
    InvalidSchema {
        reason: String,
        entity_id: Option<String>,
        field_id: Option<String>,
    },

    /// A user-supplied name cannot be turned into an identifier.
    #[error("invalid identifier '{raw}' for {context}: {reason}")]
    InvalidIdentifier {
        raw: String,
        context: String,
        reason: &'static str,
    },

    /// A validation rule was requested for a semantic type it cannot apply to,
    /// or with a parameter of the wrong shape.
    #[error("entity '{entity_id}', field '{field_id}': rule '{rule}' is not valid for {semantic_type} fields ({reason})")]
    IncompatibleValidation {
        entity_id: String,
        field_id: String,
        rule: String,
        semantic_type: SemanticType,
        reason: String,
    },

    /// A reference names an entity that does not exist, or the resolved graph is asymmetric.
    #[error("entity '{entity_id}', field '{field_id}': dangling relationship ({reason})")]
    DanglingRelationship {
        entity_id: String,
        field_id: String,
        reason: String,
    },

    #[error("stack variant '{variant}' has no template for {kind} artifacts")]
    UnsupportedArtifactForVariant {
        variant: StackVariant,
        kind: ArtifactKind,
    },

    /// Two generated artifacts resolved to the same relative path.
    #[error("path collision at '{path}' between artifacts of entities {first:?} and {second:?}")]
    PathCollision {
        path: String,
        first: Option<String>,
        second: Option<String>,
    },

    #[error("template '{template}' failed to render: {source}")]
    Template {
        template: String,
        #[source]
        source: minijinja::Error,
    },
}

impl GenerationError {
    pub(crate) fn invalid_schema(reason: impl Into<String>) -> Self {
        GenerationError::InvalidSchema {
            reason: reason.into(),
            entity_id: None,
            field_id: None,
        }
    }

    pub(crate) fn invalid_entity(entity_id: &str, reason: impl Into<String>) -> Self {
        GenerationError::InvalidSchema {
            reason: reason.into(),
            entity_id: Some(entity_id.to_string()),
            field_id: None,
        }
    }

    pub(crate) fn invalid_field(entity_id: &str, field_id: &str, reason: impl Into<String>) -> Self {
        GenerationError::InvalidSchema {
            reason: reason.into(),
            entity_id: Some(entity_id.to_string()),
            field_id: Some(field_id.to_string()),
        }
    }

    /// Short machine-readable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InvalidSchema { .. } => "invalid_schema",
            GenerationError::InvalidIdentifier { .. } => "invalid_identifier",
            GenerationError::IncompatibleValidation { .. } => "incompatible_validation",
            GenerationError::DanglingRelationship { .. } => "dangling_relationship",
            GenerationError::UnsupportedArtifactForVariant { .. } => "unsupported_artifact_for_variant",
            GenerationError::PathCollision { .. } => "path_collision",
            GenerationError::Template { .. } => "template",
        }
    }

    /// Entity the error refers to, if any
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            GenerationError::InvalidSchema { entity_id, .. } => entity_id.as_deref(),
            GenerationError::IncompatibleValidation { entity_id, .. }
            | GenerationError::DanglingRelationship { entity_id, .. } => Some(entity_id),
            GenerationError::PathCollision { first, .. } => first.as_deref(),
            _ => None,
        }
    }

    /// Field the error refers to, if any
    pub fn field_id(&self) -> Option<&str> {
        match self {
            GenerationError::InvalidSchema { field_id, .. } => field_id.as_deref(),
            GenerationError::IncompatibleValidation { field_id, .. }
            | GenerationError::DanglingRelationship { field_id, .. } => Some(field_id),
            _ => None,
        }
    }

    /// Validation rule the error refers to, if any
    pub fn rule(&self) -> Option<&str> {
        match self {
            GenerationError::IncompatibleValidation { rule, .. } => Some(rule),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            entity_id: self.entity_id().map(str::to_string),
            field_id: self.field_id().map(str::to_string),
            rule: self.rule().map(str::to_string),
        }
    }
}

/// Serializable error summary handed back to the editor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

/// I/O failure while writing an archive. The partial archive is never exposed.
#[derive(Debug, Error)]
#[error("failed to write archive '{name}': {source}")]
pub struct ArchiveWriteError {
    pub name: String,
    #[source]
    pub source: io::Error,
}

impl ArchiveWriteError {
    pub fn new(name: impl Into<String>, source: io::Error) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: "archive_write",
            message: self.to_string(),
            entity_id: None,
            field_id: None,
            rule: None,
        }
    }
}
