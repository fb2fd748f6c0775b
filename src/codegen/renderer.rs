//! Artifact renderer.
//!
//! Builds the rendering context for one entity from the already-resolved
//! names, relationships and validation rules, then renders each artifact
//! kind through the [`TemplateRegistry`]. Every value the templates print is
//! computed here, in field order, so output depends only on the inputs.

use serde::Serialize;
use std::collections::HashMap;

use super::artifact::{ArtifactKind, GeneratedArtifact};
use super::naming::{NameCache, NameForms};
use super::relationships::{RelationKind, Relationship, RelationshipGraph};
use super::templates::{TemplateId, TemplateRegistry};
use super::utils::{escape_html, js_string, php_string, to_snake_case};
use super::validation::FieldRules;
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::schema::{Entity, Field, Rule, SchemaDefinition, SemanticType, StackVariant};

/// Everything resolved before rendering starts. Shared read-only by all workers.
#[derive(Debug, Clone, Copy)]
pub struct RenderPlan<'a> {
    pub schema: &'a SchemaDefinition,
    pub config: &'a GeneratorConfig,
    pub names: &'a NameCache,
    pub graph: &'a RelationshipGraph,
    /// Translated rules, indexed like `schema.entities[i].fields[j]`
    pub rules: &'a [Vec<FieldRules>],
    /// Migration sequence number per entity id
    pub migration_seq: &'a HashMap<String, usize>,
}

/// Stack variant as boolean switches for templates
#[derive(Debug, Clone, Serialize)]
pub struct VariantFlags {
    pub name: &'static str,
    pub api: bool,
    pub blade: bool,
    pub inertia: bool,
    pub vue: bool,
    pub react: bool,
    pub livewire: bool,
}

impl VariantFlags {
    pub fn of(variant: StackVariant) -> Self {
        VariantFlags {
            name: variant.as_str(),
            api: variant == StackVariant::JsonApiOnly,
            blade: variant == StackVariant::ServerTemplate,
            inertia: variant.is_inertia(),
            vue: variant == StackVariant::ReactiveComponentA,
            react: variant == StackVariant::ReactiveComponentB,
            livewire: variant == StackVariant::LiveServerComponent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct RelationContext {
    accessor: String,
    /// Key in the resource array
    key: String,
    /// Record class on the other side
    model: String,
    column: String,
    /// Variable holding the select options for the foreign key
    options_var: String,
    /// Column shown for a related record
    option_label: String,
}

#[derive(Debug, Clone, Serialize)]
struct OptionContext {
    html: String,
    php: String,
}

#[derive(Debug, Clone, Serialize)]
struct FieldContext {
    column: String,
    label: String,
    camel: String,
    column_definition: String,
    cast: Option<String>,
    rules_php: String,
    rules_pipe: String,
    input: &'static str,
    step: Option<String>,
    options: Vec<OptionContext>,
    options_js: String,
    relation: Option<RelationContext>,
    php_value: String,
    php_cell: String,
    php_default: &'static str,
    php_load: String,
    js_default: String,
    js_cell: String,
}

#[derive(Debug, Clone, Serialize)]
struct CastContext {
    column: String,
    cast: String,
}

#[derive(Debug, Serialize)]
struct EntityContext<'a> {
    project: &'a NameForms,
    variant: VariantFlags,
    entity: &'a NameForms,
    fields: Vec<FieldContext>,
    casts: Vec<CastContext>,
    timestamps: bool,
    belongs_to: Vec<RelationContext>,
    belongs_to_models: Vec<String>,
    has_many: Vec<RelationContext>,
    eager_php: String,
    uses_rule_class: bool,
    reset_php: String,
    uuid_key: bool,
    /// PHP type of the primary key
    key_php_type: &'static str,
}

#[derive(Debug, Serialize)]
struct DeferredKeyContext {
    column: String,
    target: String,
    on_delete: &'static str,
}

#[derive(Debug, Serialize)]
struct DeferredTableContext {
    name: String,
    keys: Vec<DeferredKeyContext>,
}

#[derive(Debug, Serialize)]
struct DeferredKeysContext {
    tables: Vec<DeferredTableContext>,
}

#[derive(Debug, Serialize)]
struct RouteContext {
    controller: String,
    uri: String,
    parameter: String,
}

#[derive(Debug, Serialize)]
struct RoutesContext<'a> {
    project: &'a NameForms,
    variant: VariantFlags,
    routes: Vec<RouteContext>,
}

/// Relative path of an artifact inside the generated project
pub fn artifact_path(
    variant: StackVariant,
    kind: ArtifactKind,
    names: &NameForms,
    migration_seq: usize,
) -> Result<String, GenerationError> {
    let path = match kind {
        ArtifactKind::Record => format!("app/Models/{}.php", names.pascal),
        ArtifactKind::Migration => format!(
            "database/migrations/0001_01_01_{:06}_create_{}_table.php",
            migration_seq,
            names.table()
        ),
        ArtifactKind::Request => format!("app/Http/Requests/{}Request.php", names.pascal),
        ArtifactKind::Controller => format!("app/Http/Controllers/{}Controller.php", names.pascal),
        ArtifactKind::Resource => format!("app/Http/Resources/{}Resource.php", names.pascal),
        ArtifactKind::View => match variant {
            StackVariant::ServerTemplate => {
                format!("resources/views/{}/index.blade.php", names.kebab_plural)
            }
            StackVariant::ReactiveComponentA => {
                format!("resources/js/Pages/{}/Index.vue", names.pascal_plural)
            }
            StackVariant::ReactiveComponentB => {
                format!("resources/js/Pages/{}/Index.jsx", names.pascal_plural)
            }
            StackVariant::LiveServerComponent => {
                format!("resources/views/livewire/{}.blade.php", names.kebab_plural)
            }
            StackVariant::JsonApiOnly => {
                return Err(GenerationError::UnsupportedArtifactForVariant { variant, kind })
            }
        },
        ArtifactKind::Routes => routes_path(variant).to_string(),
    };
    Ok(path)
}

/// Path of the migration that adds foreign keys deferred out of a reference cycle
pub fn deferred_keys_path(migration_seq: usize) -> String {
    format!(
        "database/migrations/0001_01_01_{:06}_add_deferred_foreign_keys.php",
        migration_seq
    )
}

/// Path of the route registration file for a variant
pub fn routes_path(variant: StackVariant) -> &'static str {
    match variant {
        StackVariant::JsonApiOnly => "routes/api.php",
        _ => "routes/web.php",
    }
}

/// Renders artifacts for entities of a resolved schema
pub struct ArtifactRenderer<'a> {
    registry: &'a TemplateRegistry,
    plan: RenderPlan<'a>,
}

impl<'a> ArtifactRenderer<'a> {
    pub fn new(registry: &'a TemplateRegistry, plan: RenderPlan<'a>) -> Self {
        ArtifactRenderer { registry, plan }
    }

    /// Render every per-entity artifact for the entity at `index`
    pub fn render_entity(&self, index: usize) -> Result<Vec<GeneratedArtifact>, GenerationError> {
        let schema = self.plan.schema;
        let variant = schema.stack_variant;
        let entity = &schema.entities[index];
        let project = self.plan.names.project(&schema.name)?;
        let names = self.plan.names.entity(&entity.name)?;
        let ctx = self.entity_context(index, &project, &names)?;
        let seq = self.plan.migration_seq.get(&entity.id).copied().unwrap_or(index + 1);

        let mut artifacts = Vec::with_capacity(ArtifactKind::PER_ENTITY.len());
        for kind in ArtifactKind::PER_ENTITY {
            if kind == ArtifactKind::View && !variant.has_views() {
                continue;
            }
            let template = self.registry.template_for(variant, kind)?;
            let content = self.registry.render(template, &ctx)?;
            let relative_path = artifact_path(variant, kind, &names, seq)?;

            tracing::debug!(entity = %entity.name, kind = %kind, path = %relative_path, "rendered artifact");
            artifacts.push(GeneratedArtifact {
                relative_path,
                content,
                entity_id: Some(entity.id.clone()),
                kind,
            });
        }
        Ok(artifacts)
    }

    /// Render the route registration file listing every entity's controller
    pub fn render_routes(&self) -> Result<GeneratedArtifact, GenerationError> {
        let schema = self.plan.schema;
        let project = self.plan.names.project(&schema.name)?;

        let mut routes = Vec::with_capacity(schema.entities.len());
        for entity in &schema.entities {
            let names = self.plan.names.entity(&entity.name)?;
            routes.push(RouteContext {
                controller: format!("{}Controller", names.pascal),
                uri: names.kebab_plural.clone(),
                parameter: names.snake.clone(),
            });
        }

        let ctx = RoutesContext {
            project: &project,
            variant: VariantFlags::of(schema.stack_variant),
            routes,
        };
        let template = self.registry.template_for(schema.stack_variant, ArtifactKind::Routes)?;
        let content = self.registry.render(template, &ctx)?;

        Ok(GeneratedArtifact {
            relative_path: routes_path(schema.stack_variant).to_string(),
            content,
            entity_id: None,
            kind: ArtifactKind::Routes,
        })
    }

    /// Render the migration adding foreign keys whose target table is created
    /// after the table holding them. `None` when the schema has no such keys.
    pub fn render_deferred_keys(&self) -> Result<Option<GeneratedArtifact>, GenerationError> {
        let schema = self.plan.schema;

        let mut tables = Vec::new();
        for entity in &schema.entities {
            let mut keys = Vec::new();
            for edge in self.plan.graph.belongs_to(&entity.id).filter(|e| self.is_deferred(e)) {
                let Some(target) = schema.entity(&edge.target_entity) else {
                    continue;
                };
                let required = entity
                    .fields
                    .iter()
                    .find(|f| f.id == edge.foreign_key_field)
                    .map_or(false, |f| f.required);
                keys.push(DeferredKeyContext {
                    column: edge.foreign_key_column.clone(),
                    target: self.plan.names.entity(&target.name)?.snake_plural.clone(),
                    on_delete: on_delete(required),
                });
            }
            if !keys.is_empty() {
                tables.push(DeferredTableContext {
                    name: self.plan.names.entity(&entity.name)?.snake_plural.clone(),
                    keys,
                });
            }
        }

        if tables.is_empty() {
            return Ok(None);
        }

        let content = self
            .registry
            .render(TemplateId::DeferredForeignKeys, &DeferredKeysContext { tables })?;
        let relative_path = deferred_keys_path(schema.entities.len() + 1);
        tracing::debug!(path = %relative_path, "rendered deferred foreign keys");

        Ok(Some(GeneratedArtifact {
            relative_path,
            content,
            entity_id: None,
            kind: ArtifactKind::Migration,
        }))
    }

    /// A belongs-to edge whose target table is created after its own table
    fn is_deferred(&self, edge: &Relationship) -> bool {
        let seq = |id: &str| self.plan.migration_seq.get(id).copied();
        match (seq(&edge.source_entity), seq(&edge.target_entity)) {
            (Some(own), Some(target)) => target > own,
            _ => false,
        }
    }

    fn entity_context<'c>(
        &self,
        index: usize,
        project: &'c NameForms,
        names: &'c NameForms,
    ) -> Result<EntityContext<'c>, GenerationError> {
        let schema = self.plan.schema;
        let entity = &schema.entities[index];
        let rules = &self.plan.rules[index];

        let mut fields = Vec::with_capacity(entity.fields.len());
        for (field, field_rules) in entity.fields.iter().zip(rules) {
            fields.push(self.field_context(entity, field, field_rules)?);
        }

        let casts = fields
            .iter()
            .filter_map(|f| {
                f.cast.as_ref().map(|cast| CastContext {
                    column: f.column.clone(),
                    cast: cast.clone(),
                })
            })
            .collect();

        let belongs_to = self
            .plan
            .graph
            .belongs_to(&entity.id)
            .map(|edge| self.relation_context(edge))
            .collect::<Result<Vec<_>, _>>()?;
        let has_many = self
            .plan
            .graph
            .has_many(&entity.id)
            .map(|edge| self.relation_context(edge))
            .collect::<Result<Vec<_>, _>>()?;

        let mut belongs_to_models: Vec<String> = Vec::new();
        for rel in &belongs_to {
            if rel.model != names.pascal && !belongs_to_models.contains(&rel.model) {
                belongs_to_models.push(rel.model.clone());
            }
        }

        let eager: Vec<String> = belongs_to.iter().map(|r| php_string(&r.accessor)).collect();
        let uuid_key = self.plan.graph.uses_uuid_key(&entity.id);
        let mut reset: Vec<String> = vec![php_string("editingId")];
        reset.extend(fields.iter().map(|f| php_string(&f.column)));

        Ok(EntityContext {
            project,
            variant: VariantFlags::of(schema.stack_variant),
            entity: names,
            uses_rule_class: rules.iter().any(FieldRules::uses_rule_class),
            fields,
            casts,
            timestamps: entity.timestamps,
            belongs_to,
            belongs_to_models,
            has_many,
            eager_php: format!("[{}]", eager.join(", ")),
            reset_php: reset.join(", "),
            uuid_key,
            key_php_type: if uuid_key { "string" } else { "int" },
        })
    }

    fn relation_context(&self, edge: &Relationship) -> Result<RelationContext, GenerationError> {
        let schema = self.plan.schema;
        let other = schema.entity(&edge.target_entity).ok_or_else(|| {
            GenerationError::DanglingRelationship {
                entity_id: edge.source_entity.clone(),
                field_id: edge.foreign_key_field.clone(),
                reason: format!("unknown entity '{}'", edge.target_entity),
            }
        })?;
        let other_names = self.plan.names.entity(&other.name)?;

        let option_label = match edge.kind {
            RelationKind::BelongsTo => display_column(other),
            RelationKind::OneToMany => "id".to_string(),
        };

        Ok(RelationContext {
            key: to_snake_case(&edge.accessor),
            options_var: format!("{}Options", edge.accessor),
            accessor: edge.accessor.clone(),
            model: other_names.pascal.clone(),
            column: edge.foreign_key_column.clone(),
            option_label,
        })
    }

    fn field_context(
        &self,
        entity: &Entity,
        field: &Field,
        rules: &FieldRules,
    ) -> Result<FieldContext, GenerationError> {
        let names = self.plan.names.field(&field.name)?;
        let column = names.snake.clone();
        let ty = field.semantic_type;

        let edge = self.plan.graph.foreign_key(&entity.id, &field.id);
        let relation = match edge {
            Some(edge) => Some(self.relation_context(edge)?),
            None => None,
        };
        let target_table = match edge {
            Some(edge) => match self.plan.schema.entity(&edge.target_entity) {
                Some(target) => Some(self.plan.names.entity(&target.name)?.snake_plural.clone()),
                None => None,
            },
            None => None,
        };
        let deferred = edge.map_or(false, |e| self.is_deferred(e));

        let input = match (&relation, ty) {
            (Some(_), _) => "select",
            (None, SemanticType::String | SemanticType::Uuid) => "text",
            (None, SemanticType::LongText | SemanticType::Json) => "textarea",
            (None, SemanticType::Integer | SemanticType::Decimal | SemanticType::Float) => "number",
            (None, SemanticType::Boolean) => "checkbox",
            (None, SemanticType::Datetime) => "datetime-local",
            (None, SemanticType::Date) => "date",
            (None, SemanticType::Time) => "time",
            (None, SemanticType::Email) => "email",
            (None, SemanticType::Url) => "url",
            (None, SemanticType::Enum) => "select",
        };

        let step = match ty {
            SemanticType::Decimal => Some(decimal_step(field.scale.unwrap_or(self.plan.config.decimal_scale))),
            SemanticType::Float => Some("any".to_string()),
            _ => None,
        };

        let options: Vec<OptionContext> = field
            .enum_values
            .iter()
            .map(|v| OptionContext {
                html: escape_html(v),
                php: php_string(v),
            })
            .collect();
        let options_js = format!(
            "[{}]",
            field.enum_values.iter().map(|v| js_string(v)).collect::<Vec<_>>().join(", ")
        );

        let cast = match ty {
            SemanticType::Boolean => Some("boolean".to_string()),
            SemanticType::Integer if relation.is_none() => Some("integer".to_string()),
            SemanticType::Decimal => Some(format!(
                "decimal:{}",
                field.scale.unwrap_or(self.plan.config.decimal_scale)
            )),
            SemanticType::Float => Some("float".to_string()),
            SemanticType::Datetime => Some("datetime".to_string()),
            SemanticType::Date => Some("date".to_string()),
            _ => None,
        };

        let c = &column;
        let php_value = match ty {
            SemanticType::Datetime => format!("old('{c}', $editing?->{c}?->format('Y-m-d\\TH:i'))"),
            SemanticType::Date => format!("old('{c}', $editing?->{c}?->format('Y-m-d'))"),
            SemanticType::Time => format!("old('{c}', $editing?->{c} ? substr($editing->{c}, 0, 5) : null)"),
            _ => format!("old('{c}', $editing?->{c})"),
        };
        let php_cell = match (&relation, ty) {
            (Some(rel), _) => format!("$record->{}?->{}", rel.accessor, rel.option_label),
            (None, SemanticType::Boolean) => format!("$record->{c} ? 'Yes' : 'No'"),
            (None, SemanticType::Datetime) => format!("$record->{c}?->format('Y-m-d H:i')"),
            (None, SemanticType::Date) => format!("$record->{c}?->format('Y-m-d')"),
            _ => format!("$record->{c}"),
        };
        let php_load = match ty {
            SemanticType::Datetime => format!("$record->{c}?->format('Y-m-d\\TH:i')"),
            SemanticType::Date => format!("$record->{c}?->format('Y-m-d')"),
            SemanticType::Time => format!("$record->{c} ? substr($record->{c}, 0, 5) : null"),
            SemanticType::Boolean => format!("(bool) $record->{c}"),
            _ => format!("$record->{c}"),
        };
        let php_default = if ty == SemanticType::Boolean { "false" } else { "null" };

        let js_default = match ty {
            SemanticType::Boolean => format!("editing?.{c} ?? false"),
            SemanticType::Datetime => format!("editing?.{c}?.slice(0, 16) ?? ''"),
            SemanticType::Date => format!("editing?.{c}?.slice(0, 10) ?? ''"),
            SemanticType::Time => format!("editing?.{c}?.slice(0, 5) ?? ''"),
            _ => format!("editing?.{c} ?? ''"),
        };
        let js_cell = match (&relation, ty) {
            (Some(rel), _) => format!("record.{}?.{} ?? record.{c}", rel.key, rel.option_label),
            (None, SemanticType::Boolean) => format!("record.{c} ? 'Yes' : 'No'"),
            (None, SemanticType::Datetime) => format!("record.{c}?.slice(0, 16).replace('T', ' ')"),
            (None, SemanticType::Date) => format!("record.{c}?.slice(0, 10)"),
            _ => format!("record.{c}"),
        };

        Ok(FieldContext {
            column_definition: self.column_definition(field, &column, target_table.as_deref(), deferred),
            label: names.label.clone(),
            camel: names.camel.clone(),
            cast,
            rules_php: rules.php_array(),
            rules_pipe: rules.pipe(),
            input,
            step,
            options,
            options_js,
            relation,
            php_value,
            php_cell,
            php_default,
            php_load,
            js_default,
            js_cell,
            column,
        })
    }

    /// Schema-builder statement for one column, without the trailing `;`.
    ///
    /// A `deferred` foreign key gets its constraint from the trailing
    /// deferred-keys migration instead.
    fn column_definition(
        &self,
        field: &Field,
        column: &str,
        foreign_table: Option<&str>,
        deferred: bool,
    ) -> String {
        let config = self.plan.config;
        let col = php_string(column);

        let mut def = match (foreign_table, field.semantic_type) {
            (Some(_), SemanticType::Uuid) => format!("$table->foreignUuid({})", col),
            (Some(_), _) => format!("$table->foreignId({})", col),
            (None, SemanticType::String | SemanticType::Email | SemanticType::Url) => {
                let length = field
                    .validation(Rule::Max)
                    .and_then(|v| v.parameter.as_ref())
                    .and_then(|p| p.as_number())
                    .filter(|n| *n >= 1.0 && n.fract() == 0.0)
                    .map(|n| n as u64)
                    .unwrap_or(config.string_max_length as u64);
                format!("$table->string({}, {})", col, length)
            }
            (None, SemanticType::LongText) => format!("$table->text({})", col),
            (None, SemanticType::Integer) => format!("$table->integer({})", col),
            (None, SemanticType::Boolean) => format!("$table->boolean({})", col),
            (None, SemanticType::Datetime) => format!("$table->dateTime({})", col),
            (None, SemanticType::Date) => format!("$table->date({})", col),
            (None, SemanticType::Time) => format!("$table->time({})", col),
            (None, SemanticType::Json) => format!("$table->json({})", col),
            (None, SemanticType::Uuid) => format!("$table->uuid({})", col),
            (None, SemanticType::Enum) => {
                let values: Vec<String> = field.enum_values.iter().map(|v| php_string(v)).collect();
                format!("$table->enum({}, [{}])", col, values.join(", "))
            }
            (None, SemanticType::Decimal) => format!(
                "$table->decimal({}, {}, {})",
                col,
                field.precision.unwrap_or(config.decimal_precision),
                field.scale.unwrap_or(config.decimal_scale)
            ),
            (None, SemanticType::Float) => format!("$table->double({})", col),
        };

        if !field.required {
            def.push_str("->nullable()");
        }
        if field
            .validation(Rule::Unique)
            .map_or(false, |v| v.parameter.is_none())
        {
            def.push_str("->unique()");
        }
        if let Some(table) = foreign_table.filter(|_| !deferred) {
            def.push_str(&format!("->constrained({})", php_string(table)));
            def.push_str(on_delete(field.required));
        }
        def
    }
}

fn on_delete(required: bool) -> &'static str {
    if required {
        "->cascadeOnDelete()"
    } else {
        "->nullOnDelete()"
    }
}

/// Column shown when listing a related record: its first short text field
fn display_column(entity: &Entity) -> String {
    entity
        .fields
        .iter()
        .find(|f| matches!(f.semantic_type, SemanticType::String | SemanticType::Email))
        .map(|f| to_snake_case(f.name.trim()))
        .unwrap_or_else(|| "id".to_string())
}

/// HTML `step` attribute for a decimal scale
fn decimal_step(scale: u8) -> String {
    if scale == 0 {
        "1".to_string()
    } else {
        format!("0.{}1", "0".repeat(scale as usize - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::validation::ValidationTranslator;
    use crate::schema::{from_json, Validation};

    const SHOP: &str = r#"{
        "name": "Shop",
        "stackVariant": "server-template",
        "entities": [
            {"id": "p", "name": "Product", "fields": [
                {"id": "p1", "name": "name", "type": "string", "required": true},
                {"id": "p2", "name": "price", "type": "decimal", "required": true},
                {"id": "p3", "name": "category_id", "type": "integer", "required": true,
                 "validations": [{"rule": "exists", "parameter": "Category"}]},
                {"id": "p4", "name": "status", "type": "enum", "required": false,
                 "enumValues": ["draft", "live"]}
            ]},
            {"id": "c", "name": "Category", "fields": [
                {"id": "c1", "name": "title", "type": "string", "required": true}
            ]}
        ]
    }"#;

    fn render(schema: &SchemaDefinition, index: usize) -> Vec<GeneratedArtifact> {
        with_renderer(schema, |renderer| renderer.render_entity(index).unwrap())
    }

    fn with_renderer<T>(schema: &SchemaDefinition, f: impl FnOnce(&ArtifactRenderer<'_>) -> T) -> T {
        let config = GeneratorConfig::default();
        let names = NameCache::new();
        let (graph, _) = RelationshipGraph::resolve(schema, &config.foreign_key_suffixes, &names).unwrap();
        let rules = ValidationTranslator::new(schema, &names, &graph, &config)
            .translate_all()
            .unwrap();
        let (order, _) = graph.migration_order(schema);
        let seq: HashMap<String, usize> = order.into_iter().enumerate().map(|(i, id)| (id, i + 1)).collect();
        let registry = TemplateRegistry::new().unwrap();
        let plan = RenderPlan {
            schema,
            config: &config,
            names: &names,
            graph: &graph,
            rules: &rules,
            migration_seq: &seq,
        };
        f(&ArtifactRenderer::new(&registry, plan))
    }

    fn find(artifacts: &[GeneratedArtifact], kind: ArtifactKind) -> &GeneratedArtifact {
        artifacts.iter().find(|a| a.kind == kind).unwrap()
    }

    #[test]
    fn test_artifact_paths() {
        let names = NameForms::entity("Order Item").unwrap();
        let path = |variant, kind| artifact_path(variant, kind, &names, 3).unwrap();

        assert_eq!(path(StackVariant::JsonApiOnly, ArtifactKind::Record), "app/Models/OrderItem.php");
        assert_eq!(
            path(StackVariant::JsonApiOnly, ArtifactKind::Migration),
            "database/migrations/0001_01_01_000003_create_order_items_table.php"
        );
        assert_eq!(
            path(StackVariant::ReactiveComponentA, ArtifactKind::View),
            "resources/js/Pages/OrderItems/Index.vue"
        );
        assert_eq!(
            path(StackVariant::LiveServerComponent, ArtifactKind::View),
            "resources/views/livewire/order-items.blade.php"
        );
        assert!(artifact_path(StackVariant::JsonApiOnly, ArtifactKind::View, &names, 1).is_err());
    }

    #[test]
    fn test_renders_model_with_relations() {
        let schema = from_json(SHOP).unwrap();
        let product = render(&schema, 0);
        let model = &find(&product, ArtifactKind::Record).content;

        assert!(model.contains("class Product extends Model"));
        assert!(model.contains("'category_id',"));
        assert!(model.contains("public function category(): BelongsTo"));
        assert!(model.contains("$this->belongsTo(Category::class, 'category_id')"));
        assert!(model.contains("'price' => 'decimal:2',"));

        let category = render(&schema, 1);
        let model = &find(&category, ArtifactKind::Record).content;
        assert!(model.contains("public function products(): HasMany"));
    }

    #[test]
    fn test_renders_migration_columns_in_field_order() {
        let schema = from_json(SHOP).unwrap();
        let product = render(&schema, 0);
        let migration = find(&product, ArtifactKind::Migration);

        assert_eq!(
            migration.relative_path,
            "database/migrations/0001_01_01_000002_create_products_table.php"
        );
        let content = &migration.content;
        let name = content.find("$table->string('name', 255);").unwrap();
        let price = content.find("$table->decimal('price', 10, 2);").unwrap();
        let fk = content
            .find("$table->foreignId('category_id')->constrained('categories')->cascadeOnDelete();")
            .unwrap();
        let status = content
            .find("$table->enum('status', ['draft', 'live'])->nullable();")
            .unwrap();
        assert!(name < price && price < fk && fk < status);
        assert!(content.contains("$table->timestamps();"));
    }

    #[test]
    fn test_renders_request_rules() {
        let schema = from_json(SHOP).unwrap();
        let product = render(&schema, 0);
        let request = &find(&product, ArtifactKind::Request).content;

        assert!(request.contains("'name' => ['required', 'string', 'max:255'],"));
        assert!(request.contains("'category_id' => ['required', 'integer', 'exists:categories,id'],"));
        assert!(request.contains("use Illuminate\\Validation\\Rule;"));
        assert!(request.contains("Rule::in(['draft', 'live'])"));
    }

    #[test]
    fn test_renders_blade_view_with_echo_delimiters() {
        let schema = from_json(SHOP).unwrap();
        let product = render(&schema, 0);
        let view = find(&product, ArtifactKind::View);

        assert_eq!(view.relative_path, "resources/views/products/index.blade.php");
        assert!(view.content.contains("{{ $record->category?->title }}"));
        assert!(view.content.contains("@foreach ($categoryOptions as $option)"));
        assert!(view.content.contains("step=\"0.01\""));
    }

    #[test]
    fn test_api_variant_has_no_view() {
        let mut schema = from_json(SHOP).unwrap();
        schema.stack_variant = StackVariant::JsonApiOnly;
        let product = render(&schema, 0);
        assert_eq!(product.len(), 5);
        assert!(product.iter().all(|a| a.kind != ArtifactKind::View));
        let controller = &find(&product, ArtifactKind::Controller).content;
        assert!(controller.contains("->with(['category'])"));
        assert!(controller.contains("return response()->noContent();"));
    }

    #[test]
    fn test_unique_string_column() {
        let mut schema = from_json(SHOP).unwrap();
        schema.entities[1].fields[0]
            .validations
            .push(Validation::new(Rule::Unique));
        let category = render(&schema, 1);
        let migration = &find(&category, ArtifactKind::Migration).content;
        assert!(migration.contains("$table->string('title', 255)->unique();"));
    }

    #[test]
    fn test_uuid_key_makes_target_uuid_keyed() {
        let schema = from_json(
            r#"{
                "name": "Notes",
                "stackVariant": "live-server-component",
                "entities": [
                    {"id": "n", "name": "Note", "fields": [
                        {"id": "n1", "name": "user_id", "type": "uuid", "required": true}
                    ]},
                    {"id": "u", "name": "User", "fields": [
                        {"id": "u1", "name": "email", "type": "email", "required": true}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        let note = render(&schema, 0);
        let migration = &find(&note, ArtifactKind::Migration).content;
        assert!(migration.contains("$table->id();"));
        assert!(migration.contains("$table->foreignUuid('user_id')->constrained('users')->cascadeOnDelete();"));
        let request = &find(&note, ArtifactKind::Request).content;
        assert!(request.contains("'user_id' => ['required', 'uuid', 'exists:users,id'],"));

        let user = render(&schema, 1);
        let migration = &find(&user, ArtifactKind::Migration).content;
        assert!(migration.contains("$table->uuid('id')->primary();"));
        assert!(!migration.contains("$table->id();"));
        let model = &find(&user, ArtifactKind::Record).content;
        assert!(model.contains("use HasUuids;"));
        let view = &find(&user, ArtifactKind::View).content;
        assert!(view.contains("public ?string $editingId = null;"));
        assert!(view.contains("public function edit(string $id): void"));
    }

    #[test]
    fn test_cyclic_keys_are_constrained_afterwards() {
        let schema = from_json(
            r#"{
                "name": "Cycle",
                "stackVariant": "json-api-only",
                "entities": [
                    {"id": "a", "name": "Alpha", "fields": [
                        {"id": "a1", "name": "beta_id", "type": "integer", "required": true}
                    ]},
                    {"id": "b", "name": "Beta", "fields": [
                        {"id": "b1", "name": "alpha_id", "type": "integer", "required": false}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        let alpha = render(&schema, 0);
        let migration = find(&alpha, ArtifactKind::Migration);
        assert_eq!(
            migration.relative_path,
            "database/migrations/0001_01_01_000001_create_alphas_table.php"
        );
        assert!(migration.content.contains("$table->foreignId('beta_id');"));
        assert!(!migration.content.contains("constrained"));

        let beta = render(&schema, 1);
        let migration = &find(&beta, ArtifactKind::Migration).content;
        assert!(migration.contains("$table->foreignId('alpha_id')->nullable()->constrained('alphas')->nullOnDelete();"));

        let deferred = with_renderer(&schema, |r| r.render_deferred_keys().unwrap()).unwrap();
        assert_eq!(deferred.kind, ArtifactKind::Migration);
        assert_eq!(deferred.entity_id, None);
        assert_eq!(
            deferred.relative_path,
            "database/migrations/0001_01_01_000003_add_deferred_foreign_keys.php"
        );
        assert!(deferred
            .content
            .contains("$table->foreign('beta_id')->references('id')->on('betas')->cascadeOnDelete();"));
        assert!(deferred.content.contains("$table->dropForeign(['beta_id']);"));
        assert!(!deferred.content.contains("alpha_id"));
    }

    #[test]
    fn test_no_deferred_keys_without_cycle() {
        let schema = from_json(SHOP).unwrap();
        assert!(with_renderer(&schema, |r| r.render_deferred_keys().unwrap()).is_none());
    }

    #[test]
    fn test_decimal_step() {
        assert_eq!(decimal_step(0), "1");
        assert_eq!(decimal_step(2), "0.01");
        assert_eq!(decimal_step(4), "0.0001");
    }
}
