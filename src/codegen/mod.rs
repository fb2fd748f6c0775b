//! Project generation framework.
//!
//! Turns a [`SchemaDefinition`](crate::schema::SchemaDefinition) into a
//! Laravel project tree: names and relationships are resolved up front,
//! validation rules are translated per field, artifacts are rendered per
//! entity from minijinja templates and assembled over a variant skeleton.

pub mod artifact;
pub mod assembler;
pub mod fs_utils;
pub mod naming;
pub mod orchestration;
pub mod relationships;
pub mod renderer;
pub mod skeleton;
pub mod templates;
pub mod utils;
pub mod validation;

// Re-export key types
pub use artifact::{ArtifactKind, GeneratedArtifact, ProjectTree};
pub use assembler::ProjectAssembler;
pub use naming::{pluralize, singularize, NameCache, NameForms};
pub use orchestration::{generate, ArtifactEntry, Generated, Generator};
pub use relationships::{GenerationWarning, RelationKind, Relationship, RelationshipGraph, WarningKind};
pub use renderer::{artifact_path, routes_path, ArtifactRenderer, RenderPlan};
pub use templates::{TemplateId, TemplateRegistry};
pub use validation::{FieldRules, RuleToken, ValidationTranslator};
