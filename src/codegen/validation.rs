//! Validation translator.
//!
//! Turns a field's semantic type, required flag and user rules into the
//! ordered rule list the request class declares:
//!
//! 1. `bail`
//! 2. implicit `required` / `nullable`
//! 3. remaining presence rules
//! 4. type rules (implicit first)
//! 5. constraints (implicit first)
//!
//! Order within a stage follows the user's declaration order. A rule the user
//! declares replaces the implicit rule of the same name.

use serde::Serialize;
use std::collections::HashSet;

use super::naming::{entity_key, NameCache};
use super::relationships::RelationshipGraph;
use super::utils::php_string;
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::schema::{Entity, Field, Rule, RuleStage, SchemaDefinition, SemanticType};

/// One rule in the generated rule array
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleToken {
    pub rule: Rule,
    /// Pipe-syntax form, e.g. `max:255`
    pub text: String,
    /// PHP expression placed in the rules array
    pub php: String,
}

impl RuleToken {
    fn plain(rule: Rule, param: Option<String>) -> Self {
        let text = match param {
            Some(p) => format!("{}:{}", rule.name(), p),
            None => rule.name().to_string(),
        };
        RuleToken {
            rule,
            php: php_string(&text),
            text,
        }
    }

    fn expression(rule: Rule, text: String, php: String) -> Self {
        RuleToken { rule, text, php }
    }

    /// Whether the PHP form uses the `Rule` builder class
    pub fn uses_rule_class(&self) -> bool {
        self.php.starts_with("Rule::")
    }
}

/// Translated rules for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRules {
    pub field_id: String,
    pub tokens: Vec<RuleToken>,
}

impl FieldRules {
    /// `required|string|max:255`
    pub fn pipe(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// `['required', 'string', 'max:255']`
    pub fn php_array(&self) -> String {
        let items: Vec<&str> = self.tokens.iter().map(|t| t.php.as_str()).collect();
        format!("[{}]", items.join(", "))
    }

    pub fn uses_rule_class(&self) -> bool {
        self.tokens.iter().any(RuleToken::uses_rule_class)
    }

    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.tokens.iter().map(|t| t.rule)
    }
}

/// Translates validation rules for every field of a schema
pub struct ValidationTranslator<'a> {
    schema: &'a SchemaDefinition,
    names: &'a NameCache,
    graph: &'a RelationshipGraph,
    config: &'a GeneratorConfig,
}

impl<'a> ValidationTranslator<'a> {
    pub fn new(
        schema: &'a SchemaDefinition,
        names: &'a NameCache,
        graph: &'a RelationshipGraph,
        config: &'a GeneratorConfig,
    ) -> Self {
        ValidationTranslator {
            schema,
            names,
            graph,
            config,
        }
    }

    /// Translate every field, in entity then field order
    pub fn translate_all(&self) -> Result<Vec<Vec<FieldRules>>, GenerationError> {
        self.schema
            .entities
            .iter()
            .map(|entity| {
                entity
                    .fields
                    .iter()
                    .map(|field| self.translate(entity, field))
                    .collect()
            })
            .collect()
    }

    /// Translate a single field's rules
    pub fn translate(&self, entity: &Entity, field: &Field) -> Result<FieldRules, GenerationError> {
        let ty = field.semantic_type;
        let incompatible = |rule: Rule, reason: String| GenerationError::IncompatibleValidation {
            entity_id: entity.id.clone(),
            field_id: field.id.clone(),
            rule: rule.name().to_string(),
            semantic_type: ty,
            reason,
        };

        let declared: HashSet<Rule> = field.validations.iter().map(|v| v.rule).collect();

        for validation in &field.validations {
            if !validation.rule.applies_to(ty) {
                return Err(incompatible(
                    validation.rule,
                    "rule does not apply to this type".to_string(),
                ));
            }
            match validation.rule {
                Rule::Nullable if field.required => {
                    return Err(incompatible(Rule::Nullable, "field is required".to_string()))
                }
                Rule::Required if !field.required => {
                    return Err(incompatible(Rule::Required, "field is optional".to_string()))
                }
                Rule::Prohibited if field.required => {
                    return Err(incompatible(Rule::Prohibited, "field is required".to_string()))
                }
                _ => {}
            }
        }

        let mut tokens = Vec::new();

        if declared.contains(&Rule::Bail) {
            tokens.push(RuleToken::plain(Rule::Bail, None));
        }
        tokens.push(RuleToken::plain(
            if field.required { Rule::Required } else { Rule::Nullable },
            None,
        ));

        let user_tokens = |stage: RuleStage, tokens: &mut Vec<RuleToken>| -> Result<(), GenerationError> {
            for validation in field
                .validations
                .iter()
                .filter(|v| v.rule.stage() == stage)
                .filter(|v| !matches!(v.rule, Rule::Bail | Rule::Required | Rule::Nullable))
            {
                let token = self
                    .user_token(entity, field, validation.rule, validation.parameter.as_ref())
                    .map_err(|reason| incompatible(validation.rule, reason))??;
                tokens.push(token);
            }
            Ok(())
        };

        user_tokens(RuleStage::Presence, &mut tokens)?;

        for token in self.implicit_type_tokens(field) {
            if !declared.contains(&token.rule) {
                tokens.push(token);
            }
        }
        user_tokens(RuleStage::Type, &mut tokens)?;

        for token in self.implicit_constraints(entity, field)? {
            if !declared.contains(&token.rule) {
                tokens.push(token);
            }
        }
        user_tokens(RuleStage::Constraint, &mut tokens)?;

        let mut seen = HashSet::new();
        tokens.retain(|t| seen.insert(t.text.clone()));

        Ok(FieldRules {
            field_id: field.id.clone(),
            tokens,
        })
    }

    fn implicit_type_tokens(&self, field: &Field) -> Vec<RuleToken> {
        use SemanticType as T;

        match field.semantic_type {
            T::String | T::LongText => vec![RuleToken::plain(Rule::String, None)],
            T::Integer => vec![RuleToken::plain(Rule::Integer, None)],
            T::Boolean => vec![RuleToken::plain(Rule::Boolean, None)],
            T::Date | T::Datetime => vec![RuleToken::plain(Rule::Date, None)],
            T::Time => vec![RuleToken::plain(Rule::DateFormat, Some("H:i".to_string()))],
            T::Json => vec![RuleToken::plain(Rule::Json, None)],
            T::Uuid => vec![RuleToken::plain(Rule::Uuid, None)],
            T::Email => vec![
                RuleToken::plain(Rule::String, None),
                RuleToken::plain(Rule::Email, None),
            ],
            T::Url => vec![
                RuleToken::plain(Rule::String, None),
                RuleToken::plain(Rule::Url, None),
            ],
            T::Enum => vec![RuleToken::plain(Rule::String, None)],
            T::Float => vec![RuleToken::plain(Rule::Numeric, None)],
            T::Decimal => {
                let scale = field.scale.unwrap_or(self.config.decimal_scale);
                vec![
                    RuleToken::plain(Rule::Numeric, None),
                    RuleToken::plain(Rule::Decimal, Some(format!("0,{}", scale))),
                ]
            }
        }
    }

    fn implicit_constraints(&self, entity: &Entity, field: &Field) -> Result<Vec<RuleToken>, GenerationError> {
        let mut tokens = Vec::new();

        if field.semantic_type == SemanticType::Enum {
            tokens.push(in_token(Rule::In, &field.enum_values));
        }

        let has_length_rule = [Rule::Max, Rule::Size, Rule::Between]
            .iter()
            .any(|r| field.validation(*r).is_some());
        if matches!(
            field.semantic_type,
            SemanticType::String | SemanticType::Email | SemanticType::Url
        ) && !has_length_rule
        {
            tokens.push(RuleToken::plain(
                Rule::Max,
                Some(self.config.string_max_length.to_string()),
            ));
        }

        if let Some(edge) = self.graph.foreign_key(&entity.id, &field.id) {
            let target = self.schema.entity(&edge.target_entity).ok_or_else(|| {
                GenerationError::DanglingRelationship {
                    entity_id: entity.id.clone(),
                    field_id: field.id.clone(),
                    reason: format!("unknown target entity '{}'", edge.target_entity),
                }
            })?;
            let table = self.names.entity(&target.name)?.snake_plural.clone();
            tokens.push(RuleToken::plain(Rule::Exists, Some(format!("{},id", table))));
        }

        Ok(tokens)
    }

    /// Token for a user-declared rule.
    ///
    /// The outer error is a parameter-shape problem, reported as an
    /// incompatible validation by the caller.
    fn user_token(
        &self,
        entity: &Entity,
        field: &Field,
        rule: Rule,
        param: Option<&crate::schema::RuleParam>,
    ) -> Result<Result<RuleToken, GenerationError>, String> {
        let rendered = rule.render_param(param)?;

        let token = match rule {
            Rule::In | Rule::NotIn => {
                let items = param.map(|p| p.items()).unwrap_or_default();
                Ok(in_token(rule, &items))
            }
            Rule::Unique => self.unique_token(entity, field, rendered),
            Rule::Exists => self.exists_token(entity, field, rendered.unwrap_or_default()),
            _ => Ok(RuleToken::plain(rule, rendered)),
        };
        Ok(token)
    }

    fn unique_token(
        &self,
        entity: &Entity,
        field: &Field,
        column: Option<String>,
    ) -> Result<RuleToken, GenerationError> {
        let entity_names = self.names.entity(&entity.name)?;
        let column = match column {
            Some(c) => c.trim().to_string(),
            None => self.names.field(&field.name)?.snake.clone(),
        };
        let table = entity_names.table();

        Ok(RuleToken::expression(
            Rule::Unique,
            format!("unique:{},{}", table, column),
            format!(
                "Rule::unique({}, {})->ignore($ignore)",
                php_string(table),
                php_string(&column)
            ),
        ))
    }

    fn exists_token(&self, entity: &Entity, field: &Field, target: String) -> Result<RuleToken, GenerationError> {
        let key = entity_key(&target);
        let found = self
            .schema
            .entities
            .iter()
            .find(|e| e.id == target || entity_key(&e.name) == key)
            .ok_or_else(|| GenerationError::DanglingRelationship {
                entity_id: entity.id.clone(),
                field_id: field.id.clone(),
                reason: format!("'exists' references unknown entity '{}'", target),
            })?;
        let uuid_key = self.graph.uses_uuid_key(&found.id);
        let mismatch = match field.semantic_type {
            SemanticType::Integer => uuid_key,
            SemanticType::Uuid => !uuid_key,
            _ => false,
        };
        if mismatch {
            let key_type = if uuid_key { "uuid" } else { "integer" };
            return Err(GenerationError::IncompatibleValidation {
                entity_id: entity.id.clone(),
                field_id: field.id.clone(),
                rule: Rule::Exists.name().to_string(),
                semantic_type: field.semantic_type,
                reason: format!("{} has {} primary keys", found.name, key_type),
            });
        }

        let table = self.names.entity(&found.name)?.snake_plural.clone();
        Ok(RuleToken::plain(Rule::Exists, Some(format!("{},id", table))))
    }
}

/// `in` / `not_in` as a `Rule` builder call so values may contain commas
fn in_token(rule: Rule, values: &[String]) -> RuleToken {
    let method = if rule == Rule::NotIn { "notIn" } else { "in" };
    let quoted: Vec<String> = values.iter().map(|v| php_string(v)).collect();
    RuleToken::expression(
        rule,
        format!("{}:{}", rule.name(), values.join(",")),
        format!("Rule::{}([{}])", method, quoted.join(", ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{StackVariant, Validation};

    fn field(id: &str, name: &str, ty: SemanticType, required: bool) -> Field {
        Field {
            id: id.to_string(),
            name: name.to_string(),
            semantic_type: ty,
            required,
            validations: Vec::new(),
            enum_values: Vec::new(),
            precision: None,
            scale: None,
        }
    }

    fn shop(fields: Vec<Field>) -> SchemaDefinition {
        SchemaDefinition {
            name: "Shop".to_string(),
            stack_variant: StackVariant::JsonApiOnly,
            entities: vec![
                Entity {
                    id: "p".to_string(),
                    name: "Product".to_string(),
                    fields,
                    timestamps: true,
                },
                Entity {
                    id: "c".to_string(),
                    name: "Category".to_string(),
                    fields: vec![],
                    timestamps: true,
                },
            ],
        }
    }

    fn translate(schema: &SchemaDefinition, field_idx: usize) -> Result<FieldRules, GenerationError> {
        let names = NameCache::new();
        let config = GeneratorConfig::default();
        let (graph, _) = RelationshipGraph::resolve(schema, &config.foreign_key_suffixes, &names)?;
        let translator = ValidationTranslator::new(schema, &names, &graph, &config);
        let entity = &schema.entities[0];
        translator.translate(entity, &entity.fields[field_idx])
    }

    #[test]
    fn test_required_string_gets_implicit_rules() {
        let schema = shop(vec![field("f1", "name", SemanticType::String, true)]);
        let rules = translate(&schema, 0).unwrap();
        assert_eq!(rules.pipe(), "required|string|max:255");
        assert_eq!(rules.php_array(), "['required', 'string', 'max:255']");
    }

    #[test]
    fn test_optional_decimal() {
        let mut price = field("f1", "price", SemanticType::Decimal, false);
        price.validations.push(Validation::with_param(Rule::Min, 0));
        let schema = shop(vec![price]);
        let rules = translate(&schema, 0).unwrap();
        assert_eq!(rules.pipe(), "nullable|numeric|decimal:0,2|min:0");
    }

    #[test]
    fn test_user_max_replaces_implicit_length() {
        let mut title = field("f1", "title", SemanticType::String, true);
        title.validations.push(Validation::with_param(Rule::Max, 80));
        title.validations.push(Validation::new(Rule::Bail));
        let schema = shop(vec![title]);
        let rules = translate(&schema, 0).unwrap();
        assert_eq!(rules.pipe(), "bail|required|string|max:80");
    }

    #[test]
    fn test_duplicate_user_type_rule_is_deduplicated() {
        let mut name = field("f1", "name", SemanticType::String, true);
        name.validations.push(Validation::new(Rule::String));
        name.validations.push(Validation::new(Rule::Required));
        let schema = shop(vec![name]);
        let rules = translate(&schema, 0).unwrap();
        assert_eq!(rules.pipe(), "required|string|max:255");
    }

    #[test]
    fn test_email_on_boolean_is_incompatible() {
        let mut active = field("f1", "active", SemanticType::Boolean, true);
        active.validations.push(Validation::new(Rule::Email));
        let schema = shop(vec![active]);
        let err = translate(&schema, 0).unwrap_err();
        assert!(matches!(err, GenerationError::IncompatibleValidation { .. }));
        assert_eq!(err.rule(), Some("email"));
        assert_eq!(err.field_id(), Some("f1"));
    }

    #[test]
    fn test_nullable_on_required_field_is_incompatible() {
        let mut name = field("f1", "name", SemanticType::String, true);
        name.validations.push(Validation::new(Rule::Nullable));
        let schema = shop(vec![name]);
        assert_eq!(translate(&schema, 0).unwrap_err().rule(), Some("nullable"));
    }

    #[test]
    fn test_bad_parameter_shape_is_incompatible() {
        let mut name = field("f1", "name", SemanticType::String, true);
        name.validations.push(Validation::with_param(Rule::Max, "lots"));
        let schema = shop(vec![name]);
        let err = translate(&schema, 0).unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn test_unique_uses_rule_builder_with_ignore() {
        let mut sku = field("f1", "sku", SemanticType::String, true);
        sku.validations.push(Validation::new(Rule::Unique));
        let schema = shop(vec![sku]);
        let rules = translate(&schema, 0).unwrap();
        assert!(rules.uses_rule_class());
        assert_eq!(
            rules.tokens.last().unwrap().php,
            "Rule::unique('products', 'sku')->ignore($ignore)"
        );
    }

    #[test]
    fn test_enum_values_become_in_rule() {
        let mut status = field("f1", "status", SemanticType::Enum, true);
        status.enum_values = vec!["draft".to_string(), "on, sale".to_string()];
        let schema = shop(vec![status]);
        let rules = translate(&schema, 0).unwrap();
        assert_eq!(rules.tokens[2].php, "Rule::in(['draft', 'on, sale'])");
    }

    #[test]
    fn test_foreign_key_gets_exists() {
        let schema = shop(vec![field("f1", "category_id", SemanticType::Integer, true)]);
        let rules = translate(&schema, 0).unwrap();
        assert_eq!(rules.pipe(), "required|integer|exists:categories,id");
    }

    #[test]
    fn test_uuid_foreign_key_gets_uuid_exists() {
        let schema = shop(vec![field("f1", "category_id", SemanticType::Uuid, true)]);
        let rules = translate(&schema, 0).unwrap();
        assert_eq!(rules.pipe(), "required|uuid|exists:categories,id");
    }

    #[test]
    fn test_exists_with_mismatched_key_type_is_incompatible() {
        // 'owner' has no key suffix, so Category keeps integer ids
        let mut owner = field("f1", "owner", SemanticType::Uuid, true);
        owner.validations.push(Validation::with_param(Rule::Exists, "Category"));
        let schema = shop(vec![owner]);
        let err = translate(&schema, 0).unwrap_err();
        assert!(matches!(err, GenerationError::IncompatibleValidation { .. }));
        assert_eq!(err.rule(), Some("exists"));
        assert!(err.to_string().contains("integer primary keys"));
    }

    #[test]
    fn test_time_field_format() {
        let schema = shop(vec![field("f1", "opens_at", SemanticType::Time, false)]);
        let rules = translate(&schema, 0).unwrap();
        assert_eq!(rules.pipe(), "nullable|date_format:H:i");
    }
}
