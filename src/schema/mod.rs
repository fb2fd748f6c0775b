//! In-memory representation of the user's schema design.

pub mod loader;
pub mod rules;
pub mod types;

pub use loader::{from_json, from_yaml, load_schema, validate_schema, StoredSchema};
pub use rules::{ParamItem, ParamShape, Rule, RuleParam, RuleStage};
pub use types::{Entity, Field, SchemaDefinition, SemanticType, StackVariant, Validation};
