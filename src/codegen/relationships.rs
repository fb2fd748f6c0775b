//! Relationship graph for entity references
//!
//! Infers belongs-to / one-to-many edges from foreign-key shaped fields and
//! explicit `exists` hints, and computes the order in which tables must be
//! created so every foreign key points at an existing table.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::naming::{entity_key, singularize, NameCache};
use super::utils::{to_camel_case, to_snake_case};
use crate::error::GenerationError;
use crate::schema::{Entity, Field, Rule, SchemaDefinition, SemanticType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    BelongsTo,
    OneToMany,
}

/// One directed edge of the relationship graph.
///
/// For `BelongsTo` the foreign key lives on `source_entity`; for `OneToMany`
/// it lives on `target_entity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub source_entity: String,
    pub target_entity: String,
    pub kind: RelationKind,
    /// Id of the foreign-key field
    pub foreign_key_field: String,
    /// Column name of the foreign-key field
    pub foreign_key_column: String,
    /// Accessor name on the source entity's record class
    pub accessor: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Foreign-key shaped name but not an integer/uuid field
    ForeignKeyType,
    /// Foreign-key shaped name that matches no entity
    UnmatchedForeignKey,
    /// `exists` reference on a field whose name is not foreign-key shaped
    ReferenceNotKeyShaped,
    /// Tables reference each other in a cycle
    MigrationCycle,
    /// Integer key pointing at an entity whose primary key is a uuid
    KeyTypeMismatch,
    /// Relation accessor renamed because a column or relation already uses the name
    AccessorRenamed,
}

/// Non-fatal condition reported alongside a successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationWarning {
    pub kind: WarningKind,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    pub message: String,
}

/// Resolved relationships for a whole schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipGraph {
    edges: Vec<Relationship>,
    /// Entities whose primary key is a uuid because a uuid key references them
    uuid_keys: BTreeSet<String>,
}

struct ForeignKey<'a> {
    owner: &'a Entity,
    field: &'a Field,
    target: &'a Entity,
    column: String,
    stem: String,
}

impl RelationshipGraph {
    /// Build the relationship graph from entity definitions
    pub fn resolve(
        schema: &SchemaDefinition,
        suffixes: &[String],
        names: &NameCache,
    ) -> Result<(Self, Vec<GenerationWarning>), GenerationError> {
        let mut warnings = Vec::new();
        let mut keys = Vec::new();

        for entity in &schema.entities {
            for field in &entity.fields {
                if let Some(fk) = classify_field(schema, entity, field, suffixes, names, &mut warnings)? {
                    keys.push(fk);
                }
            }
        }

        // A uuid key makes its target uuid-keyed; integer keys to that target can't be constrained
        let uuid_keys: BTreeSet<String> = keys
            .iter()
            .filter(|fk| fk.field.semantic_type == SemanticType::Uuid)
            .map(|fk| fk.target.id.clone())
            .collect();
        keys.retain(|fk| {
            let uuid_field = fk.field.semantic_type == SemanticType::Uuid;
            if uuid_field == uuid_keys.contains(&fk.target.id) {
                return true;
            }
            warnings.push(GenerationWarning {
                kind: WarningKind::KeyTypeMismatch,
                entity_id: fk.owner.id.clone(),
                field_id: Some(fk.field.id.clone()),
                message: format!(
                    "{}.{} is an integer key but {} uses uuid primary keys; generated as a plain column",
                    fk.owner.name, fk.field.name, fk.target.name
                ),
            });
            false
        });

        // Several keys from one source to one target need distinct inverse names
        let mut pair_counts: HashMap<(&str, &str), usize> = HashMap::new();
        for fk in &keys {
            *pair_counts
                .entry((fk.owner.id.as_str(), fk.target.id.as_str()))
                .or_insert(0) += 1;
        }

        let mut members: HashMap<&str, HashSet<String>> = HashMap::new();
        for entity in &schema.entities {
            members.insert(entity.id.as_str(), column_names(entity, names)?);
        }

        let mut accessors = Vec::with_capacity(keys.len());
        for fk in &keys {
            let taken = members.entry(fk.owner.id.as_str()).or_default();
            accessors.push(claim_accessor(taken, fk.owner, fk, &to_camel_case(&fk.stem), &mut warnings));
        }

        let mut inverse_accessors = Vec::with_capacity(keys.len());
        for fk in &keys {
            let owner_names = names.entity(&fk.owner.name)?;
            let shared = pair_counts[&(fk.owner.id.as_str(), fk.target.id.as_str())] > 1;
            let preferred = if shared {
                to_camel_case(&format!("{}_{}", fk.stem, owner_names.snake_plural))
            } else {
                owner_names.camel_plural.clone()
            };
            let taken = members.entry(fk.target.id.as_str()).or_default();
            inverse_accessors.push(claim_accessor(taken, fk.target, fk, &preferred, &mut warnings));
        }

        let mut edges = Vec::with_capacity(keys.len() * 2);
        for ((fk, accessor), inverse_accessor) in keys.iter().zip(accessors).zip(inverse_accessors) {
            edges.push(Relationship {
                source_entity: fk.owner.id.clone(),
                target_entity: fk.target.id.clone(),
                kind: RelationKind::BelongsTo,
                foreign_key_field: fk.field.id.clone(),
                foreign_key_column: fk.column.clone(),
                accessor,
            });
            edges.push(Relationship {
                source_entity: fk.target.id.clone(),
                target_entity: fk.owner.id.clone(),
                kind: RelationKind::OneToMany,
                foreign_key_field: fk.field.id.clone(),
                foreign_key_column: fk.column.clone(),
                accessor: inverse_accessor,
            });
        }

        let graph = RelationshipGraph { edges, uuid_keys };
        graph.check_symmetry()?;

        for warning in &warnings {
            tracing::warn!(
                entity = %warning.entity_id,
                field = ?warning.field_id,
                "{}",
                warning.message
            );
        }

        Ok((graph, warnings))
    }

    pub fn edges(&self) -> &[Relationship] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether an entity's primary key is a uuid rather than an auto-increment integer
    pub fn uses_uuid_key(&self, entity_id: &str) -> bool {
        self.uuid_keys.contains(entity_id)
    }

    /// Belongs-to edges owned by an entity
    pub fn belongs_to<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.kind == RelationKind::BelongsTo && e.source_entity == entity_id)
    }

    /// One-to-many edges from an entity to the entities referencing it
    pub fn has_many<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.kind == RelationKind::OneToMany && e.source_entity == entity_id)
    }

    /// Belongs-to edge created by a specific field, if any
    pub fn foreign_key(&self, entity_id: &str, field_id: &str) -> Option<&Relationship> {
        self.edges.iter().find(|e| {
            e.kind == RelationKind::BelongsTo
                && e.source_entity == entity_id
                && e.foreign_key_field == field_id
        })
    }

    /// Every belongs-to edge has exactly one inverse one-to-many edge and vice versa
    pub fn check_symmetry(&self) -> Result<(), GenerationError> {
        for edge in &self.edges {
            let inverse_kind = match edge.kind {
                RelationKind::BelongsTo => RelationKind::OneToMany,
                RelationKind::OneToMany => RelationKind::BelongsTo,
            };
            let inverses = self
                .edges
                .iter()
                .filter(|other| {
                    other.kind == inverse_kind
                        && other.source_entity == edge.target_entity
                        && other.target_entity == edge.source_entity
                        && other.foreign_key_field == edge.foreign_key_field
                })
                .count();

            if inverses != 1 {
                let owner = match edge.kind {
                    RelationKind::BelongsTo => &edge.source_entity,
                    RelationKind::OneToMany => &edge.target_entity,
                };
                return Err(GenerationError::DanglingRelationship {
                    entity_id: owner.clone(),
                    field_id: edge.foreign_key_field.clone(),
                    reason: format!("{:?} edge has {} inverse edges, expected 1", edge.kind, inverses),
                });
            }
        }
        Ok(())
    }

    /// Compute table creation order (Kahn's algorithm, level by level).
    ///
    /// Within a level entities keep schema order. Self references are ignored;
    /// entities caught in a cycle are appended in schema order with a warning.
    pub fn migration_order(&self, schema: &SchemaDefinition) -> (Vec<String>, Option<GenerationWarning>) {
        let mut depends_on: HashMap<&str, HashSet<&str>> = HashMap::new();
        for edge in &self.edges {
            if edge.kind == RelationKind::BelongsTo && edge.source_entity != edge.target_entity {
                depends_on
                    .entry(edge.source_entity.as_str())
                    .or_default()
                    .insert(edge.target_entity.as_str());
            }
        }

        let mut order: Vec<String> = Vec::with_capacity(schema.entities.len());
        let mut placed: HashSet<&str> = HashSet::new();

        loop {
            let level: Vec<&str> = schema
                .entities
                .iter()
                .map(|e| e.id.as_str())
                .filter(|id| !placed.contains(id))
                .filter(|id| {
                    depends_on
                        .get(id)
                        .map_or(true, |deps| deps.iter().all(|d| placed.contains(d)))
                })
                .collect();

            if level.is_empty() {
                break;
            }
            for id in level {
                placed.insert(id);
                order.push(id.to_string());
            }
        }

        let remaining: Vec<&Entity> = schema
            .entities
            .iter()
            .filter(|e| !placed.contains(e.id.as_str()))
            .collect();

        if remaining.is_empty() {
            return (order, None);
        }

        let names: Vec<&str> = remaining.iter().map(|e| e.name.as_str()).collect();
        let warning = GenerationWarning {
            kind: WarningKind::MigrationCycle,
            entity_id: remaining[0].id.clone(),
            field_id: None,
            message: format!(
                "entities {} reference each other in a cycle; their migrations keep schema order",
                names.join(", ")
            ),
        };
        order.extend(remaining.iter().map(|e| e.id.clone()));
        (order, Some(warning))
    }
}

/// Decide whether a field is a foreign key and to which entity.
fn classify_field<'a>(
    schema: &'a SchemaDefinition,
    entity: &'a Entity,
    field: &'a Field,
    suffixes: &[String],
    names: &NameCache,
    warnings: &mut Vec<GenerationWarning>,
) -> Result<Option<ForeignKey<'a>>, GenerationError> {
    let column = names.field(&field.name)?.snake.clone();

    // An inapplicable 'exists' is reported by the validation translator
    let hinted = match field
        .validation(Rule::Exists)
        .filter(|_| Rule::Exists.applies_to(field.semantic_type))
    {
        Some(validation) => {
            let target_name = validation
                .parameter
                .as_ref()
                .and_then(|p| p.as_text())
                .unwrap_or_default();
            Some(find_referenced_entity(schema, &target_name).ok_or_else(|| {
                GenerationError::DanglingRelationship {
                    entity_id: entity.id.clone(),
                    field_id: field.id.clone(),
                    reason: format!("'exists' references unknown entity '{}'", target_name),
                }
            })?)
        }
        None => None,
    };

    let suffix = suffixes
        .iter()
        .filter(|s| column.len() > s.len() && column.ends_with(s.as_str()))
        .max_by_key(|s| s.len());

    let warn = |kind: WarningKind, message: String| GenerationWarning {
        kind,
        entity_id: entity.id.clone(),
        field_id: Some(field.id.clone()),
        message,
    };

    let Some(suffix) = suffix else {
        if let Some(target) = hinted {
            warnings.push(warn(
                WarningKind::ReferenceNotKeyShaped,
                format!(
                    "{}.{} references {} but its name has no foreign-key suffix; generated as a plain column",
                    entity.name, field.name, target.name
                ),
            ));
        }
        return Ok(None);
    };

    if !field.semantic_type.is_key_like() {
        warnings.push(warn(
            WarningKind::ForeignKeyType,
            format!(
                "{}.{} looks like a foreign key but is a {} field; generated as a plain column",
                entity.name, field.name, field.semantic_type
            ),
        ));
        return Ok(None);
    }

    let stem = column[..column.len() - suffix.len()].to_string();

    let target = match hinted {
        Some(target) => target,
        None => match find_entity_by_name(schema, &singularize(&stem)) {
            Some(target) => target,
            None => {
                warnings.push(warn(
                    WarningKind::UnmatchedForeignKey,
                    format!(
                        "{}.{} matches no entity named '{}'; generated as a plain column",
                        entity.name, field.name, stem
                    ),
                ));
                return Ok(None);
            }
        },
    };

    Ok(Some(ForeignKey {
        owner: entity,
        field,
        target,
        column,
        stem,
    }))
}

/// Look up the entity an `exists` rule names, by id or by name
fn find_referenced_entity<'a>(schema: &'a SchemaDefinition, reference: &str) -> Option<&'a Entity> {
    schema
        .entities
        .iter()
        .find(|e| e.id == reference)
        .or_else(|| find_entity_by_name(schema, reference))
}

/// Look up an entity by (case-insensitive, singularized) name
fn find_entity_by_name<'a>(schema: &'a SchemaDefinition, name: &str) -> Option<&'a Entity> {
    if name.trim().is_empty() {
        return None;
    }
    let key = entity_key(name);
    schema.entities.iter().find(|e| entity_key(&e.name) == key)
}

/// Member names already used on an entity's record class (snake_case)
fn column_names(entity: &Entity, names: &NameCache) -> Result<HashSet<String>, GenerationError> {
    let mut taken: HashSet<String> = entity
        .fields
        .iter()
        .map(|f| names.field(&f.name).map(|n| n.snake.clone()))
        .collect::<Result<_, _>>()?;
    taken.insert("id".to_string());
    if entity.timestamps {
        taken.insert("created_at".to_string());
        taken.insert("updated_at".to_string());
    }
    Ok(taken)
}

/// Reserve a relation accessor on `host`, renaming it when a column or an
/// earlier relation already uses the name.
fn claim_accessor(
    taken: &mut HashSet<String>,
    host: &Entity,
    fk: &ForeignKey<'_>,
    preferred: &str,
    warnings: &mut Vec<GenerationWarning>,
) -> String {
    if taken.insert(to_snake_case(preferred)) {
        return preferred.to_string();
    }

    let mut accessor = format!("{}Relation", preferred);
    let mut n = 2;
    while !taken.insert(to_snake_case(&accessor)) {
        accessor = format!("{}Relation{}", preferred, n);
        n += 1;
    }

    warnings.push(GenerationWarning {
        kind: WarningKind::AccessorRenamed,
        entity_id: fk.owner.id.clone(),
        field_id: Some(fk.field.id.clone()),
        message: format!(
            "{}.{} is already a column or relation; the relation for {}.{} is generated as {}()",
            host.name, preferred, fk.owner.name, fk.field.name, accessor
        ),
    });
    accessor
}
