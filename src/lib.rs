//! # Schemaforge: Schema-to-Project Generator
//!
//! Schemaforge turns a visually designed data model (entities, typed fields,
//! per-field validation rules and a target stack) into a complete Laravel
//! application source tree, packaged as a single `.tar.gz` archive.
//!
//! ## Features
//!
//! - **Naming resolution**: singular/plural and casing variants with irregular nouns
//! - **Relationship inference**: belongs-to/has-many pairs from `_id` style foreign keys
//! - **Validation translation**: a closed rule catalog checked against field types
//! - **Five stack variants**: Blade, Inertia + Vue, Inertia + React, Livewire Volt, JSON API
//! - **Deterministic output**: identical schemas produce byte-identical trees and archives
//!
//! ## Example
//!
//! ```rust,no_run
//! use schemaforge::{archive, generate, load_schema, GeneratorConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = load_schema("shop.json")?;
//!     let generated = generate(&schema, &GeneratorConfig::default())?;
//!     for warning in &generated.warnings {
//!         eprintln!("warning: {}", warning.message);
//!     }
//!     let stream = archive(&generated.tree, "shop.tar.gz")?;
//!     stream.save_to("shop.tar.gz")?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod codegen;
pub mod config;
pub mod error;
pub mod schema;

// Re-export key types
pub use archive::{archive, archive_file_name, ArchiveStream, Archiver, MEDIA_TYPE};
pub use codegen::{
    generate, ArtifactKind, GeneratedArtifact, Generated, GenerationWarning, Generator, ProjectTree,
    RelationKind, Relationship, RelationshipGraph, WarningKind,
};
pub use config::GeneratorConfig;
pub use error::{ArchiveWriteError, ErrorReport, GenerationError};
pub use schema::{
    from_json, from_yaml, load_schema, Entity, Field, Rule, SchemaDefinition, SemanticType, StackVariant,
    StoredSchema, Validation,
};
