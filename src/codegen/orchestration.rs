//! High-level orchestration API for project generation.
//!
//! This module provides the single entry point that turns a validated
//! [`SchemaDefinition`] into an assembled [`ProjectTree`]:
//! 1. Validating the schema structure
//! 2. Resolving the relationship graph and migration order
//! 3. Translating every field's validation rules
//! 4. Rendering per-entity artifacts on a bounded pool of scoped threads
//! 5. Assembling skeleton, overlay, artifacts and route file
//!
//! Steps 1-3 finish before any rendering starts. Rendering only reads the
//! resolved data, so workers share nothing mutable except the name cache.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::thread;

use super::artifact::{ArtifactKind, GeneratedArtifact, ProjectTree};
use super::assembler::ProjectAssembler;
use super::naming::NameCache;
use super::relationships::{GenerationWarning, RelationshipGraph};
use super::renderer::{ArtifactRenderer, RenderPlan};
use super::templates::TemplateRegistry;
use super::validation::ValidationTranslator;
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::schema::{validate_schema, SchemaDefinition};

/// Location and origin of one generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactEntry {
    pub relative_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub kind: ArtifactKind,
}

impl From<&GeneratedArtifact> for ArtifactEntry {
    fn from(artifact: &GeneratedArtifact) -> Self {
        ArtifactEntry {
            relative_path: artifact.relative_path.clone(),
            entity_id: artifact.entity_id.clone(),
            kind: artifact.kind,
        }
    }
}

/// Result of a successful generation run
#[derive(Debug, Clone)]
pub struct Generated {
    pub tree: ProjectTree,
    /// Non-fatal findings, e.g. foreign-key shaped fields that stayed plain columns
    pub warnings: Vec<GenerationWarning>,
    pub relationships: RelationshipGraph,
    /// Entity ids in table creation order
    pub migration_order: Vec<String>,
    /// Generated (non-skeleton) files in emission order
    pub artifacts: Vec<ArtifactEntry>,
}

impl Generated {
    /// Number of generated artifacts of one kind
    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.artifacts.iter().filter(|a| a.kind == kind).count()
    }
}

/// Reusable generator: compiled templates, configuration and skeleton overlay.
///
/// Each call to [`Generator::generate`] is independent; nothing computed for
/// one schema is kept for the next.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    registry: TemplateRegistry,
    overlay: BTreeMap<String, Vec<u8>>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        Ok(Generator {
            config,
            registry: TemplateRegistry::new()?,
            overlay: BTreeMap::new(),
        })
    }

    /// Files layered over the built-in skeleton, keyed by relative path
    pub fn with_overlay(mut self, overlay: BTreeMap<String, Vec<u8>>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the project tree for a schema
    pub fn generate(&self, schema: &SchemaDefinition) -> Result<Generated, GenerationError> {
        let span = tracing::info_span!(
            "generate",
            project = %schema.name,
            variant = %schema.stack_variant,
            entities = schema.entities.len()
        );
        let _enter = span.enter();

        // 1. Structural validation, before anything else runs
        validate_schema(schema)?;

        // 2. Relationships and table order
        let names = NameCache::new();
        let project = names.project(&schema.name)?;
        let (graph, mut warnings) =
            RelationshipGraph::resolve(schema, &self.config.foreign_key_suffixes, &names)?;
        let (migration_order, cycle) = graph.migration_order(schema);
        if let Some(warning) = cycle {
            tracing::warn!(entity = %warning.entity_id, "{}", warning.message);
            warnings.push(warning);
        }
        let migration_seq: HashMap<String, usize> = migration_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i + 1))
            .collect();
        tracing::info!(edges = graph.len(), warnings = warnings.len(), "resolved relationships");

        // 3. Validation rules for every field
        let rules = ValidationTranslator::new(schema, &names, &graph, &self.config).translate_all()?;

        // 4. Per-entity rendering
        let plan = RenderPlan {
            schema,
            config: &self.config,
            names: &names,
            graph: &graph,
            rules: &rules,
            migration_seq: &migration_seq,
        };
        let renderer = ArtifactRenderer::new(&self.registry, plan);
        let mut artifacts = self.render_entities(&renderer, schema.entities.len())?;
        artifacts.push(renderer.render_routes()?);
        if let Some(keys) = renderer.render_deferred_keys()? {
            artifacts.push(keys);
        }

        // 5. Assembly
        let entries: Vec<ArtifactEntry> = artifacts.iter().map(ArtifactEntry::from).collect();
        let tree = ProjectAssembler::new(&self.registry, schema.stack_variant, &project, &self.overlay)
            .assemble(artifacts)?;

        tracing::info!(
            files = tree.len(),
            bytes = tree.total_bytes(),
            generated = entries.len(),
            "generation complete"
        );

        Ok(Generated {
            tree,
            warnings,
            relationships: graph,
            migration_order,
            artifacts: entries,
        })
    }

    /// Render every entity, fanned out over at most `worker_count` threads.
    ///
    /// Worker `w` takes entities `w, w + n, w + 2n, ...`. Results are put back
    /// in entity order and the first failing entity's error is returned, so
    /// output and errors do not depend on scheduling.
    fn render_entities(
        &self,
        renderer: &ArtifactRenderer<'_>,
        count: usize,
    ) -> Result<Vec<GeneratedArtifact>, GenerationError> {
        let workers = self.config.worker_count(count);
        tracing::debug!(workers, entities = count, "rendering entities");

        let mut results: Vec<(usize, Result<Vec<GeneratedArtifact>, GenerationError>)> = if workers <= 1 {
            (0..count).map(|i| (i, renderer.render_entity(i))).collect()
        } else {
            thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|worker| {
                        scope.spawn(move || {
                            (worker..count)
                                .step_by(workers)
                                .map(|i| (i, renderer.render_entity(i)))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .flat_map(|handle| match handle.join() {
                        Ok(rendered) => rendered,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            })
        };
        results.sort_by_key(|(index, _)| *index);

        let mut artifacts = Vec::new();
        for (_, rendered) in results {
            artifacts.extend(rendered?);
        }
        Ok(artifacts)
    }
}

/// Generate a project tree with a one-off [`Generator`]
pub fn generate(schema: &SchemaDefinition, config: &GeneratorConfig) -> Result<Generated, GenerationError> {
    Generator::new(config.clone())?.generate(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::relationships::{RelationKind, WarningKind};
    use crate::schema::{from_json, StackVariant};

    const BLOG: &str = r#"{
        "name": "Blog",
        "stackVariant": "reactive-component-a",
        "entities": [
            {"id": "post", "name": "Post", "fields": [
                {"id": "f1", "name": "title", "type": "string", "required": true},
                {"id": "f2", "name": "author_id", "type": "integer", "required": true,
                 "validations": [{"rule": "exists", "parameter": "User"}]},
                {"id": "f3", "name": "editor_id", "type": "integer", "required": false,
                 "validations": [{"rule": "exists", "parameter": "User"}]}
            ]},
            {"id": "user", "name": "User", "fields": [
                {"id": "u1", "name": "email", "type": "email", "required": true,
                 "validations": [{"rule": "unique"}]}
            ]},
            {"id": "tag", "name": "Tag", "fields": [
                {"id": "t1", "name": "label", "type": "string", "required": true}
            ]}
        ]
    }"#;

    fn config(workers: usize) -> GeneratorConfig {
        GeneratorConfig {
            workers,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_generate_blog() {
        let schema = from_json(BLOG).unwrap();
        let generated = generate(&schema, &config(2)).unwrap();

        assert_eq!(generated.count(ArtifactKind::Record), 3);
        assert_eq!(generated.count(ArtifactKind::View), 3);
        assert_eq!(generated.count(ArtifactKind::Routes), 1);
        assert!(generated.warnings.is_empty());

        // User has no dependencies, so it is created before Post
        assert_eq!(generated.migration_order, vec!["user", "tag", "post"]);
        assert!(generated
            .tree
            .contains("database/migrations/0001_01_01_000001_create_users_table.php"));
        assert!(generated
            .tree
            .contains("database/migrations/0001_01_01_000003_create_posts_table.php"));

        let belongs_to: Vec<_> = generated
            .relationships
            .edges()
            .iter()
            .filter(|e| e.kind == RelationKind::BelongsTo)
            .map(|e| e.accessor.as_str())
            .collect();
        assert_eq!(belongs_to, vec!["author", "editor"]);
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let schema = from_json(BLOG).unwrap();
        let single = generate(&schema, &config(1)).unwrap();
        let many = generate(&schema, &config(8)).unwrap();
        assert_eq!(single.tree, many.tree);
        assert_eq!(single.artifacts, many.artifacts);
    }

    #[test]
    fn test_first_entity_error_wins() {
        let mut schema = from_json(BLOG).unwrap();
        schema.stack_variant = StackVariant::JsonApiOnly;
        schema.entities[2].fields[0].validations =
            vec![crate::schema::Validation::with_param(crate::schema::Rule::Mimes, "pdf")];
        schema.entities[1].fields[0].validations =
            vec![crate::schema::Validation::with_param(crate::schema::Rule::Digits, 4)];

        let err = generate(&schema, &config(4)).unwrap_err();
        assert_eq!(err.kind(), "incompatible_validation");
        assert_eq!(err.entity_id(), Some("user"));
    }

    #[test]
    fn test_self_reference_and_warning() {
        let schema = from_json(
            r#"{
                "name": "Org",
                "stackVariant": "json-api-only",
                "entities": [
                    {"id": "e", "name": "Employee", "fields": [
                        {"id": "f1", "name": "employee_id", "type": "integer", "required": false},
                        {"id": "f2", "name": "team_id", "type": "string", "required": false}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        let generated = generate(&schema, &config(0)).unwrap();
        assert_eq!(generated.relationships.len(), 2);
        assert_eq!(generated.warnings.len(), 1);
        assert_eq!(generated.warnings[0].kind, WarningKind::ForeignKeyType);
    }

    #[test]
    fn test_overlay_files_are_included() {
        let schema = from_json(BLOG).unwrap();
        let mut overlay = BTreeMap::new();
        overlay.insert("docs/NOTES.md".to_string(), b"notes".to_vec());

        let generated = Generator::new(GeneratorConfig::default())
            .unwrap()
            .with_overlay(overlay)
            .generate(&schema)
            .unwrap();
        assert_eq!(generated.tree.get("docs/NOTES.md"), Some(&b"notes"[..]));
    }
}
