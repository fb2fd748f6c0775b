//! Schema loading and boundary validation.
//!
//! Handles parsing schema definitions from JSON/YAML payloads and stored
//! records, and checks the structural invariants every later stage relies on.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::codegen::naming::{entity_key, normalize_key, validate_identifier};
use crate::error::GenerationError;

use super::types::{Entity, Field, SchemaDefinition, SemanticType, StackVariant};

/// Field names the generated migrations always define themselves
const RESERVED_FIELD_NAMES: [&str; 1] = ["id"];
const TIMESTAMP_FIELD_NAMES: [&str; 2] = ["created_at", "updated_at"];

/// Parse a schema definition from a JSON payload and validate it
pub fn from_json(json: &str) -> Result<SchemaDefinition, GenerationError> {
    let schema: SchemaDefinition = serde_json::from_str(json)
        .map_err(|e| GenerationError::invalid_schema(format!("failed to parse schema JSON: {}", e)))?;
    validate_schema(&schema)?;
    Ok(schema)
}

/// Parse a schema definition from a YAML document and validate it
pub fn from_yaml(yaml: &str) -> Result<SchemaDefinition, GenerationError> {
    let schema: SchemaDefinition = serde_yaml::from_str(yaml)
        .map_err(|e| GenerationError::invalid_schema(format!("failed to parse schema YAML: {}", e)))?;
    validate_schema(&schema)?;
    Ok(schema)
}

/// Load a schema definition from a `.json`, `.yaml` or `.yml` file
///
/// # Example
///
/// ```ignore
/// use schemaforge::schema::load_schema;
///
/// let schema = load_schema("config/examples/shop.json").unwrap();
/// ```
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<SchemaDefinition, GenerationError> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path).map_err(|e| {
        GenerationError::invalid_schema(format!("failed to read {}: {}", path.display(), e))
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => from_yaml(&contents),
        Some("json") => from_json(&contents),
        _ => Err(GenerationError::invalid_schema(format!(
            "unsupported schema file extension: {}",
            path.display()
        ))),
    }
}

/// Schema record as kept by the persistence layer: metadata columns plus a JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSchema {
    pub id: String,
    pub name: String,
    /// Stack column, e.g. "json-api-only" or "vue"
    pub stack: String,
    /// Serialized entity list, either `{"entities": [...]}` or a bare array
    pub definition: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntities {
    Wrapped { entities: Vec<Entity> },
    Bare(Vec<Entity>),
}

impl StoredSchema {
    /// Rebuild and validate the schema definition held by this record
    pub fn into_definition(self) -> Result<SchemaDefinition, GenerationError> {
        let stack_variant = StackVariant::parse(&self.stack).ok_or_else(|| {
            GenerationError::invalid_schema(format!(
                "stored schema '{}' has unknown stack '{}'",
                self.id, self.stack
            ))
        })?;

        let entities = match serde_json::from_str::<StoredEntities>(&self.definition) {
            Ok(StoredEntities::Wrapped { entities }) | Ok(StoredEntities::Bare(entities)) => entities,
            Err(e) => {
                return Err(GenerationError::invalid_schema(format!(
                    "stored schema '{}' has a malformed definition: {}",
                    self.id, e
                )))
            }
        };

        let schema = SchemaDefinition {
            name: self.name,
            stack_variant,
            entities,
        };
        validate_schema(&schema)?;
        Ok(schema)
    }
}

/// Validate schema definition
///
/// Checks for:
/// - Valid project name and a non-empty entity list
/// - Unique, non-empty entity and field ids
/// - Entity and field names that normalize to distinct identifiers
/// - One validation per rule on each field
/// - Enum and decimal metadata consistent with the semantic type
pub fn validate_schema(schema: &SchemaDefinition) -> Result<(), GenerationError> {
    validate_identifier(&schema.name, "schema name")?;

    if schema.entities.is_empty() {
        return Err(GenerationError::invalid_schema("schema has no entities"));
    }

    let mut entity_ids = HashSet::new();
    let mut entity_names = HashSet::new();

    for entity in &schema.entities {
        if entity.id.trim().is_empty() {
            return Err(GenerationError::invalid_schema(format!(
                "entity '{}' has an empty id",
                entity.name
            )));
        }
        if !entity_ids.insert(entity.id.as_str()) {
            return Err(GenerationError::invalid_entity(
                &entity.id,
                format!("duplicate entity id '{}'", entity.id),
            ));
        }

        validate_identifier(&entity.name, &format!("entity '{}'", entity.id))?;
        if !entity_names.insert(entity_key(&entity.name)) {
            return Err(GenerationError::invalid_entity(
                &entity.id,
                format!("entity name '{}' duplicates another entity", entity.name),
            ));
        }

        validate_entity(entity)?;
    }

    Ok(())
}

/// Validate entity definition and its fields
pub fn validate_entity(entity: &Entity) -> Result<(), GenerationError> {
    let mut field_ids = HashSet::new();
    let mut field_names = HashSet::new();

    for field in &entity.fields {
        if field.id.trim().is_empty() {
            return Err(GenerationError::invalid_entity(
                &entity.id,
                format!("field '{}' has an empty id", field.name),
            ));
        }
        if !field_ids.insert(field.id.as_str()) {
            return Err(GenerationError::invalid_field(
                &entity.id,
                &field.id,
                format!("duplicate field id '{}'", field.id),
            ));
        }

        validate_identifier(&field.name, &format!("field '{}' of entity '{}'", field.id, entity.id))?;

        let key = normalize_key(&field.name);
        if RESERVED_FIELD_NAMES.contains(&key.as_str())
            || (entity.timestamps && TIMESTAMP_FIELD_NAMES.contains(&key.as_str()))
        {
            return Err(GenerationError::invalid_field(
                &entity.id,
                &field.id,
                format!("field name '{}' is reserved", field.name),
            ));
        }
        if !field_names.insert(key) {
            return Err(GenerationError::invalid_field(
                &entity.id,
                &field.id,
                format!("field name '{}' duplicates another field", field.name),
            ));
        }

        validate_field(field, &entity.id)?;
    }

    Ok(())
}

/// Validate field definition
fn validate_field(field: &Field, entity_id: &str) -> Result<(), GenerationError> {
    let mut rules = HashSet::new();
    for validation in &field.validations {
        if !rules.insert(validation.rule) {
            return Err(GenerationError::invalid_field(
                entity_id,
                &field.id,
                format!("rule '{}' is declared more than once", validation.rule),
            ));
        }
    }

    if field.semantic_type == SemanticType::Enum {
        if field.enum_values.is_empty() {
            return Err(GenerationError::invalid_field(
                entity_id,
                &field.id,
                "enum field needs at least one value",
            ));
        }
        let mut seen = HashSet::new();
        for value in &field.enum_values {
            if value.trim().is_empty() || !seen.insert(value.as_str()) {
                return Err(GenerationError::invalid_field(
                    entity_id,
                    &field.id,
                    format!("enum value '{}' is empty or repeated", value),
                ));
            }
        }
    } else if !field.enum_values.is_empty() {
        return Err(GenerationError::invalid_field(
            entity_id,
            &field.id,
            format!("enum values given for a {} field", field.semantic_type),
        ));
    }

    if field.precision.is_some() || field.scale.is_some() {
        if field.semantic_type != SemanticType::Decimal {
            return Err(GenerationError::invalid_field(
                entity_id,
                &field.id,
                format!("precision/scale given for a {} field", field.semantic_type),
            ));
        }
        let precision = field.precision.unwrap_or(crate::config::DEFAULT_DECIMAL_PRECISION);
        let scale = field.scale.unwrap_or(crate::config::DEFAULT_DECIMAL_SCALE);
        if precision == 0 || precision > 65 || scale > precision {
            return Err(GenerationError::invalid_field(
                entity_id,
                &field.id,
                format!("invalid decimal precision {} / scale {}", precision, scale),
            ));
        }
    }

    Ok(())
}
