//! Project assembler.
//!
//! Layers, from bottom to top: the variant skeleton, the configured skeleton
//! overlay, every per-entity artifact, and the route registration file.
//! A generated file replaces a skeleton file at the same path; two generated
//! files at the same path are a [`GenerationError::PathCollision`].

use std::collections::{BTreeMap, HashMap};

use super::artifact::{GeneratedArtifact, ProjectTree};
use super::naming::NameForms;
use super::skeleton::render_skeleton;
use super::templates::TemplateRegistry;
use crate::error::GenerationError;
use crate::schema::StackVariant;

/// Merges skeleton and generated artifacts into one [`ProjectTree`]
pub struct ProjectAssembler<'a> {
    registry: &'a TemplateRegistry,
    variant: StackVariant,
    project: &'a NameForms,
    overlay: &'a BTreeMap<String, Vec<u8>>,
}

impl<'a> ProjectAssembler<'a> {
    pub fn new(
        registry: &'a TemplateRegistry,
        variant: StackVariant,
        project: &'a NameForms,
        overlay: &'a BTreeMap<String, Vec<u8>>,
    ) -> Self {
        ProjectAssembler {
            registry,
            variant,
            project,
            overlay,
        }
    }

    /// Assemble the project tree.
    ///
    /// `artifacts` holds per-entity output in entity order followed by the
    /// cross-entity aggregation files.
    pub fn assemble(&self, artifacts: Vec<GeneratedArtifact>) -> Result<ProjectTree, GenerationError> {
        let mut tree = ProjectTree::new();

        for (path, content) in render_skeleton(self.registry, self.variant, self.project)? {
            tree.insert(path, content);
        }
        for (path, content) in self.overlay {
            tree.insert(path.clone(), content.clone());
        }
        let skeleton_files = tree.len();

        // Owner of each generated path, for collision reporting
        let mut owners: HashMap<String, Option<String>> = HashMap::with_capacity(artifacts.len());
        let mut overridden = 0usize;

        for artifact in artifacts {
            if let Some(first) = owners.get(&artifact.relative_path) {
                return Err(GenerationError::PathCollision {
                    path: artifact.relative_path,
                    first: first.clone(),
                    second: artifact.entity_id,
                });
            }

            if tree.contains(&artifact.relative_path) {
                tracing::debug!(path = %artifact.relative_path, "generated file replaces skeleton file");
                overridden += 1;
            }
            owners.insert(artifact.relative_path.clone(), artifact.entity_id);
            tree.insert(artifact.relative_path, artifact.content);
        }

        tracing::debug!(
            skeleton = skeleton_files,
            generated = owners.len(),
            overridden,
            total = tree.len(),
            "assembled project tree"
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::artifact::ArtifactKind;

    fn artifact(path: &str, entity: Option<&str>) -> GeneratedArtifact {
        GeneratedArtifact {
            relative_path: path.to_string(),
            content: format!("// {}", path),
            entity_id: entity.map(str::to_string),
            kind: ArtifactKind::Record,
        }
    }

    fn assemble(
        variant: StackVariant,
        overlay: &BTreeMap<String, Vec<u8>>,
        artifacts: Vec<GeneratedArtifact>,
    ) -> Result<ProjectTree, GenerationError> {
        let registry = TemplateRegistry::new().unwrap();
        let project = NameForms::project("Shop").unwrap();
        ProjectAssembler::new(&registry, variant, &project, overlay).assemble(artifacts)
    }

    #[test]
    fn test_generated_overrides_skeleton() {
        let tree = assemble(
            StackVariant::JsonApiOnly,
            &BTreeMap::new(),
            vec![artifact("routes/api.php", None)],
        )
        .unwrap();
        assert_eq!(tree.get_str("routes/api.php"), Some("// routes/api.php"));
        assert!(tree.contains("composer.json"));
    }

    #[test]
    fn test_generated_collision_is_error() {
        let err = assemble(
            StackVariant::JsonApiOnly,
            &BTreeMap::new(),
            vec![
                artifact("app/Models/Item.php", Some("e1")),
                artifact("app/Models/Item.php", Some("e2")),
            ],
        )
        .unwrap_err();

        match err {
            GenerationError::PathCollision { path, first, second } => {
                assert_eq!(path, "app/Models/Item.php");
                assert_eq!(first.as_deref(), Some("e1"));
                assert_eq!(second.as_deref(), Some("e2"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_overlay_replaces_skeleton_but_not_generated() {
        let mut overlay = BTreeMap::new();
        overlay.insert("README.md".to_string(), b"custom".to_vec());
        overlay.insert("app/Models/Item.php".to_string(), b"stale".to_vec());

        let tree = assemble(
            StackVariant::ServerTemplate,
            &overlay,
            vec![artifact("app/Models/Item.php", Some("e1"))],
        )
        .unwrap();
        assert_eq!(tree.get("README.md"), Some(&b"custom"[..]));
        assert_eq!(tree.get_str("app/Models/Item.php"), Some("// app/Models/Item.php"));
    }
}
