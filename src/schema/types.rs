//! Type definitions for the user's schema design.
//!
//! These types mirror the payload the visual editor saves: a named schema,
//! a stack variant, and an ordered list of entities with typed fields.
//! Ordering of `entities`, `fields` and `validations` is insertion order
//! and is never re-sorted; generated output depends on it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::rules::{Rule, RuleParam};

fn default_timestamps() -> bool {
    true
}

/// Root aggregate handed to the generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    /// Project identifier (normalized into package/directory names)
    pub name: String,
    /// Target application flavor
    #[serde(alias = "stack")]
    pub stack_variant: StackVariant,
    /// Entities in editor order
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl SchemaDefinition {
    /// Find an entity by its opaque id
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }
}

/// One data model / database table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    /// User-facing singular name, e.g. "Order"
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Whether created_at/updated_at columns are generated
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,
}

impl Entity {
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// Field definition on an entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", alias = "semanticType")]
    pub semantic_type: SemanticType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub validations: Vec<Validation>,
    /// Allowed values for `enum` fields
    #[serde(default)]
    pub enum_values: Vec<String>,
    /// Total digits for `decimal` columns
    #[serde(default)]
    pub precision: Option<u8>,
    /// Digits after the decimal point for `decimal` columns
    #[serde(default)]
    pub scale: Option<u8>,
}

impl Field {
    /// Find the validation for a rule, if the field declares it
    pub fn validation(&self, rule: Rule) -> Option<&Validation> {
        self.validations.iter().find(|v| v.rule == rule)
    }
}

/// A single validation rule attached to a field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Validation {
    pub rule: Rule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<RuleParam>,
}

impl Validation {
    pub fn new(rule: Rule) -> Self {
        Self { rule, parameter: None }
    }

    pub fn with_param(rule: Rule, parameter: impl Into<RuleParam>) -> Self {
        Self {
            rule,
            parameter: Some(parameter.into()),
        }
    }
}

/// Logical field type, independent of any storage engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticType {
    String,
    Integer,
    Boolean,
    #[serde(alias = "text", alias = "long_text")]
    LongText,
    #[serde(alias = "date-time", alias = "timestamp")]
    Datetime,
    Date,
    Time,
    Json,
    Uuid,
    Email,
    Url,
    Enum,
    Decimal,
    Float,
}

impl SemanticType {
    pub const ALL: [SemanticType; 14] = [
        SemanticType::String,
        SemanticType::Integer,
        SemanticType::Boolean,
        SemanticType::LongText,
        SemanticType::Datetime,
        SemanticType::Date,
        SemanticType::Time,
        SemanticType::Json,
        SemanticType::Uuid,
        SemanticType::Email,
        SemanticType::Url,
        SemanticType::Enum,
        SemanticType::Decimal,
        SemanticType::Float,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::String => "string",
            SemanticType::Integer => "integer",
            SemanticType::Boolean => "boolean",
            SemanticType::LongText => "long-text",
            SemanticType::Datetime => "datetime",
            SemanticType::Date => "date",
            SemanticType::Time => "time",
            SemanticType::Json => "json",
            SemanticType::Uuid => "uuid",
            SemanticType::Email => "email",
            SemanticType::Url => "url",
            SemanticType::Enum => "enum",
            SemanticType::Decimal => "decimal",
            SemanticType::Float => "float",
        }
    }

    /// Types stored as character data
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            SemanticType::String
                | SemanticType::LongText
                | SemanticType::Email
                | SemanticType::Url
                | SemanticType::Uuid
                | SemanticType::Enum
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SemanticType::Integer | SemanticType::Decimal | SemanticType::Float
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            SemanticType::Date | SemanticType::Datetime | SemanticType::Time
        )
    }

    /// Types a foreign key column may have
    pub fn is_key_like(&self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Uuid)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target application flavor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StackVariant {
    /// Server-rendered Blade templates
    #[serde(rename = "server-template", alias = "blade")]
    ServerTemplate,
    /// Inertia + Vue single-file components
    #[serde(rename = "reactive-component-a", alias = "vue")]
    ReactiveComponentA,
    /// Inertia + React components
    #[serde(rename = "reactive-component-b", alias = "react")]
    ReactiveComponentB,
    /// Livewire (Volt) components
    #[serde(rename = "live-server-component", alias = "livewire")]
    LiveServerComponent,
    /// JSON API only, no view layer
    #[serde(rename = "json-api-only", alias = "api")]
    JsonApiOnly,
}

impl StackVariant {
    pub const ALL: [StackVariant; 5] = [
        StackVariant::ServerTemplate,
        StackVariant::ReactiveComponentA,
        StackVariant::ReactiveComponentB,
        StackVariant::LiveServerComponent,
        StackVariant::JsonApiOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StackVariant::ServerTemplate => "server-template",
            StackVariant::ReactiveComponentA => "reactive-component-a",
            StackVariant::ReactiveComponentB => "reactive-component-b",
            StackVariant::LiveServerComponent => "live-server-component",
            StackVariant::JsonApiOnly => "json-api-only",
        }
    }

    /// Parse a variant name or one of its short aliases
    pub fn parse(s: &str) -> Option<StackVariant> {
        match s.trim().to_lowercase().as_str() {
            "server-template" | "blade" => Some(StackVariant::ServerTemplate),
            "reactive-component-a" | "vue" => Some(StackVariant::ReactiveComponentA),
            "reactive-component-b" | "react" => Some(StackVariant::ReactiveComponentB),
            "live-server-component" | "livewire" => Some(StackVariant::LiveServerComponent),
            "json-api-only" | "api" => Some(StackVariant::JsonApiOnly),
            _ => None,
        }
    }

    /// Whether the variant produces any view-layer artifact
    pub fn has_views(&self) -> bool {
        !matches!(self, StackVariant::JsonApiOnly)
    }

    /// Whether pages are rendered client-side through Inertia
    pub fn is_inertia(&self) -> bool {
        matches!(
            self,
            StackVariant::ReactiveComponentA | StackVariant::ReactiveComponentB
        )
    }
}

impl fmt::Display for StackVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_schema_payload() {
        let json = r#"{
            "name": "Shop",
            "stackVariant": "json-api-only",
            "entities": [{
                "id": "e1",
                "name": "Product",
                "fields": [
                    {"id": "f1", "name": "name", "type": "string", "required": true},
                    {"id": "f2", "name": "price", "type": "decimal", "required": true,
                     "validations": [{"rule": "min", "parameter": 0}]}
                ]
            }]
        }"#;

        let schema: SchemaDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(schema.stack_variant, StackVariant::JsonApiOnly);
        assert_eq!(schema.entities.len(), 1);
        assert!(schema.entities[0].timestamps);
        assert_eq!(schema.entities[0].fields[1].semantic_type, SemanticType::Decimal);
        assert_eq!(schema.entities[0].fields[1].validations[0].rule, Rule::Min);
    }

    #[test]
    fn test_stack_variant_aliases() {
        let v: StackVariant = serde_json::from_str("\"vue\"").unwrap();
        assert_eq!(v, StackVariant::ReactiveComponentA);
        assert_eq!(StackVariant::parse("Livewire"), Some(StackVariant::LiveServerComponent));
        assert_eq!(StackVariant::parse("angular"), None);
    }

    #[test]
    fn test_semantic_type_groups() {
        assert!(SemanticType::Email.is_textual());
        assert!(SemanticType::Float.is_numeric());
        assert!(SemanticType::Time.is_temporal());
        assert!(SemanticType::Uuid.is_key_like());
        assert!(!SemanticType::String.is_key_like());
    }

    #[test]
    fn test_unknown_rule_is_rejected() {
        let json = r#"{"rule": "definitely_not_a_rule"}"#;
        assert!(serde_json::from_str::<Validation>(json).is_err());
    }
}
