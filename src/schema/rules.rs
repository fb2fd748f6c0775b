//! Catalog of recognized validation rules.
//!
//! Each rule has a fixed parameter shape, an evaluation stage and an
//! applicability predicate over [`SemanticType`]. The catalog is closed:
//! unknown rule names fail deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::SemanticType;

/// Validation rule identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    // presence
    Bail,
    Required,
    Nullable,
    Sometimes,
    Filled,
    Present,
    Prohibited,
    RequiredIf,
    RequiredUnless,
    RequiredWith,
    RequiredWithout,
    // type
    String,
    Integer,
    Numeric,
    Boolean,
    Date,
    Email,
    Url,
    ActiveUrl,
    Uuid,
    Ulid,
    Json,
    Decimal,
    Ip,
    Ipv4,
    Ipv6,
    MacAddress,
    Timezone,
    File,
    Image,
    // size and magnitude
    Min,
    Max,
    Between,
    Size,
    Gt,
    Gte,
    Lt,
    Lte,
    MultipleOf,
    Digits,
    DigitsBetween,
    MinDigits,
    MaxDigits,
    // text shape
    Alpha,
    AlphaDash,
    AlphaNum,
    Ascii,
    Lowercase,
    Uppercase,
    StartsWith,
    EndsWith,
    DoesntStartWith,
    DoesntEndWith,
    Regex,
    NotRegex,
    // dates
    After,
    AfterOrEqual,
    Before,
    BeforeOrEqual,
    DateEquals,
    DateFormat,
    // booleans
    Accepted,
    Declined,
    // sets, comparisons and database checks
    In,
    NotIn,
    Same,
    Different,
    Confirmed,
    Unique,
    Exists,
    // files
    Mimes,
    Mimetypes,
    Extensions,
    Dimensions,
}

/// Where a rule sits in the emitted rule list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleStage {
    Presence,
    Type,
    Constraint,
}

/// Parameter shape expected by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    None,
    Number,
    NumberPair,
    Text,
    OptionalText,
    List,
    /// Name of another entity in the schema
    EntityRef,
}

impl Rule {
    pub const ALL: [Rule; 74] = [
        Rule::Bail,
        Rule::Required,
        Rule::Nullable,
        Rule::Sometimes,
        Rule::Filled,
        Rule::Present,
        Rule::Prohibited,
        Rule::RequiredIf,
        Rule::RequiredUnless,
        Rule::RequiredWith,
        Rule::RequiredWithout,
        Rule::String,
        Rule::Integer,
        Rule::Numeric,
        Rule::Boolean,
        Rule::Date,
        Rule::Email,
        Rule::Url,
        Rule::ActiveUrl,
        Rule::Uuid,
        Rule::Ulid,
        Rule::Json,
        Rule::Decimal,
        Rule::Ip,
        Rule::Ipv4,
        Rule::Ipv6,
        Rule::MacAddress,
        Rule::Timezone,
        Rule::File,
        Rule::Image,
        Rule::Min,
        Rule::Max,
        Rule::Between,
        Rule::Size,
        Rule::Gt,
        Rule::Gte,
        Rule::Lt,
        Rule::Lte,
        Rule::MultipleOf,
        Rule::Digits,
        Rule::DigitsBetween,
        Rule::MinDigits,
        Rule::MaxDigits,
        Rule::Alpha,
        Rule::AlphaDash,
        Rule::AlphaNum,
        Rule::Ascii,
        Rule::Lowercase,
        Rule::Uppercase,
        Rule::StartsWith,
        Rule::EndsWith,
        Rule::DoesntStartWith,
        Rule::DoesntEndWith,
        Rule::Regex,
        Rule::NotRegex,
        Rule::After,
        Rule::AfterOrEqual,
        Rule::Before,
        Rule::BeforeOrEqual,
        Rule::DateEquals,
        Rule::DateFormat,
        Rule::Accepted,
        Rule::Declined,
        Rule::In,
        Rule::NotIn,
        Rule::Same,
        Rule::Different,
        Rule::Confirmed,
        Rule::Unique,
        Rule::Exists,
        Rule::Mimes,
        Rule::Mimetypes,
        Rule::Extensions,
        Rule::Dimensions,
    ];

    /// Rule name as written in the target framework
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Bail => "bail",
            Rule::Required => "required",
            Rule::Nullable => "nullable",
            Rule::Sometimes => "sometimes",
            Rule::Filled => "filled",
            Rule::Present => "present",
            Rule::Prohibited => "prohibited",
            Rule::RequiredIf => "required_if",
            Rule::RequiredUnless => "required_unless",
            Rule::RequiredWith => "required_with",
            Rule::RequiredWithout => "required_without",
            Rule::String => "string",
            Rule::Integer => "integer",
            Rule::Numeric => "numeric",
            Rule::Boolean => "boolean",
            Rule::Date => "date",
            Rule::Email => "email",
            Rule::Url => "url",
            Rule::ActiveUrl => "active_url",
            Rule::Uuid => "uuid",
            Rule::Ulid => "ulid",
            Rule::Json => "json",
            Rule::Decimal => "decimal",
            Rule::Ip => "ip",
            Rule::Ipv4 => "ipv4",
            Rule::Ipv6 => "ipv6",
            Rule::MacAddress => "mac_address",
            Rule::Timezone => "timezone",
            Rule::File => "file",
            Rule::Image => "image",
            Rule::Min => "min",
            Rule::Max => "max",
            Rule::Between => "between",
            Rule::Size => "size",
            Rule::Gt => "gt",
            Rule::Gte => "gte",
            Rule::Lt => "lt",
            Rule::Lte => "lte",
            Rule::MultipleOf => "multiple_of",
            Rule::Digits => "digits",
            Rule::DigitsBetween => "digits_between",
            Rule::MinDigits => "min_digits",
            Rule::MaxDigits => "max_digits",
            Rule::Alpha => "alpha",
            Rule::AlphaDash => "alpha_dash",
            Rule::AlphaNum => "alpha_num",
            Rule::Ascii => "ascii",
            Rule::Lowercase => "lowercase",
            Rule::Uppercase => "uppercase",
            Rule::StartsWith => "starts_with",
            Rule::EndsWith => "ends_with",
            Rule::DoesntStartWith => "doesnt_start_with",
            Rule::DoesntEndWith => "doesnt_end_with",
            Rule::Regex => "regex",
            Rule::NotRegex => "not_regex",
            Rule::After => "after",
            Rule::AfterOrEqual => "after_or_equal",
            Rule::Before => "before",
            Rule::BeforeOrEqual => "before_or_equal",
            Rule::DateEquals => "date_equals",
            Rule::DateFormat => "date_format",
            Rule::Accepted => "accepted",
            Rule::Declined => "declined",
            Rule::In => "in",
            Rule::NotIn => "not_in",
            Rule::Same => "same",
            Rule::Different => "different",
            Rule::Confirmed => "confirmed",
            Rule::Unique => "unique",
            Rule::Exists => "exists",
            Rule::Mimes => "mimes",
            Rule::Mimetypes => "mimetypes",
            Rule::Extensions => "extensions",
            Rule::Dimensions => "dimensions",
        }
    }

    pub fn stage(&self) -> RuleStage {
        match self {
            Rule::Bail
            | Rule::Required
            | Rule::Nullable
            | Rule::Sometimes
            | Rule::Filled
            | Rule::Present
            | Rule::Prohibited
            | Rule::RequiredIf
            | Rule::RequiredUnless
            | Rule::RequiredWith
            | Rule::RequiredWithout => RuleStage::Presence,
            Rule::String
            | Rule::Integer
            | Rule::Numeric
            | Rule::Boolean
            | Rule::Date
            | Rule::Email
            | Rule::Url
            | Rule::ActiveUrl
            | Rule::Uuid
            | Rule::Ulid
            | Rule::Json
            | Rule::Decimal
            | Rule::Ip
            | Rule::Ipv4
            | Rule::Ipv6
            | Rule::MacAddress
            | Rule::Timezone
            | Rule::File
            | Rule::Image => RuleStage::Type,
            _ => RuleStage::Constraint,
        }
    }

    pub fn param_shape(&self) -> ParamShape {
        match self {
            Rule::Min
            | Rule::Max
            | Rule::Size
            | Rule::Gt
            | Rule::Gte
            | Rule::Lt
            | Rule::Lte
            | Rule::MultipleOf
            | Rule::Digits
            | Rule::MinDigits
            | Rule::MaxDigits => ParamShape::Number,
            Rule::Between | Rule::DigitsBetween => ParamShape::NumberPair,
            Rule::RequiredIf
            | Rule::RequiredUnless
            | Rule::RequiredWith
            | Rule::RequiredWithout
            | Rule::Regex
            | Rule::NotRegex
            | Rule::After
            | Rule::AfterOrEqual
            | Rule::Before
            | Rule::BeforeOrEqual
            | Rule::DateEquals
            | Rule::DateFormat
            | Rule::Same
            | Rule::Different
            | Rule::Dimensions => ParamShape::Text,
            Rule::Decimal | Rule::Unique => ParamShape::OptionalText,
            Rule::StartsWith
            | Rule::EndsWith
            | Rule::DoesntStartWith
            | Rule::DoesntEndWith
            | Rule::In
            | Rule::NotIn
            | Rule::Mimes
            | Rule::Mimetypes
            | Rule::Extensions => ParamShape::List,
            Rule::Exists => ParamShape::EntityRef,
            _ => ParamShape::None,
        }
    }

    /// Whether the rule can be evaluated against a value of the given type.
    ///
    /// File rules are recognized but apply to no semantic type.
    pub fn applies_to(&self, ty: SemanticType) -> bool {
        use SemanticType as T;

        match self {
            Rule::Bail
            | Rule::Required
            | Rule::Nullable
            | Rule::Sometimes
            | Rule::Filled
            | Rule::Present
            | Rule::Prohibited
            | Rule::RequiredIf
            | Rule::RequiredUnless
            | Rule::RequiredWith
            | Rule::RequiredWithout
            | Rule::Same
            | Rule::Different
            | Rule::Confirmed
            | Rule::In
            | Rule::NotIn => true,

            Rule::String => ty.is_textual(),
            Rule::Integer => ty == T::Integer,
            Rule::Numeric => ty.is_numeric(),
            Rule::Decimal => matches!(ty, T::Decimal | T::Float),
            Rule::Boolean | Rule::Accepted | Rule::Declined => ty == T::Boolean,
            Rule::Date => matches!(ty, T::Date | T::Datetime),
            Rule::Email => matches!(ty, T::String | T::Email),
            Rule::Url | Rule::ActiveUrl => matches!(ty, T::String | T::Url),
            Rule::Uuid => matches!(ty, T::String | T::Uuid),
            Rule::Json => matches!(ty, T::Json | T::String | T::LongText),
            Rule::Ulid | Rule::Ip | Rule::Ipv4 | Rule::Ipv6 | Rule::MacAddress | Rule::Timezone => {
                ty == T::String
            }

            Rule::Min | Rule::Max | Rule::Between | Rule::Size => {
                ty.is_numeric() || matches!(ty, T::String | T::LongText | T::Email | T::Url)
            }
            Rule::Gt | Rule::Gte | Rule::Lt | Rule::Lte | Rule::MultipleOf => ty.is_numeric(),
            Rule::Digits | Rule::DigitsBetween | Rule::MinDigits | Rule::MaxDigits => {
                matches!(ty, T::Integer | T::String)
            }

            Rule::Alpha
            | Rule::AlphaDash
            | Rule::AlphaNum
            | Rule::Ascii
            | Rule::Lowercase
            | Rule::Uppercase
            | Rule::StartsWith
            | Rule::EndsWith
            | Rule::DoesntStartWith
            | Rule::DoesntEndWith
            | Rule::Regex
            | Rule::NotRegex => ty.is_textual(),

            Rule::After
            | Rule::AfterOrEqual
            | Rule::Before
            | Rule::BeforeOrEqual
            | Rule::DateEquals
            | Rule::DateFormat => ty.is_temporal(),

            Rule::Unique => !matches!(ty, T::Json | T::LongText),
            Rule::Exists => !matches!(ty, T::Json | T::Boolean),

            Rule::File
            | Rule::Image
            | Rule::Mimes
            | Rule::Mimetypes
            | Rule::Extensions
            | Rule::Dimensions => false,
        }
    }

    /// Render the parameter into the text that follows `rule:` in the target syntax.
    ///
    /// Returns `Err(reason)` when the parameter does not match the rule's shape.
    /// Entity references are returned verbatim for the translator to resolve.
    pub fn render_param(&self, param: Option<&RuleParam>) -> Result<Option<String>, String> {
        match (self.param_shape(), param) {
            (ParamShape::None, None) | (ParamShape::None, Some(RuleParam::Bool(true))) => Ok(None),
            (ParamShape::None, Some(_)) => Err("rule takes no parameter".to_string()),

            (ParamShape::Number, Some(p)) => p
                .as_number()
                .map(|n| Some(format_number(n)))
                .ok_or_else(|| "expects a numeric parameter".to_string()),

            (ParamShape::NumberPair, Some(p)) => {
                let items = p.items();
                let numbers: Vec<f64> = items.iter().filter_map(|s| s.parse::<f64>().ok()).collect();
                if items.len() != 2 || numbers.len() != 2 {
                    return Err("expects two numeric bounds".to_string());
                }
                if numbers[0] > numbers[1] {
                    return Err("lower bound exceeds upper bound".to_string());
                }
                Ok(Some(format!(
                    "{},{}",
                    format_number(numbers[0]),
                    format_number(numbers[1])
                )))
            }

            (ParamShape::Text, Some(p)) | (ParamShape::EntityRef, Some(p)) => match p.as_text() {
                Some(text) if !text.trim().is_empty() => Ok(Some(text)),
                _ => Err("expects a text parameter".to_string()),
            },

            (ParamShape::OptionalText, None) => Ok(None),
            (ParamShape::OptionalText, Some(p)) => match p.as_text() {
                Some(text) if !text.trim().is_empty() => Ok(Some(text)),
                _ => Err("expects a text parameter".to_string()),
            },

            (ParamShape::List, Some(p)) => {
                let items = p.items();
                if items.is_empty() {
                    return Err("expects a non-empty list".to_string());
                }
                Ok(Some(items.join(",")))
            }

            (_, None) => Err("missing required parameter".to_string()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rule parameter as stored by the editor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RuleParam {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<ParamItem>),
}

/// Single element of a list parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamItem {
    Number(f64),
    Text(String),
}

impl fmt::Display for ParamItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamItem::Number(n) => f.write_str(&format_number(*n)),
            ParamItem::Text(s) => f.write_str(s),
        }
    }
}

impl RuleParam {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuleParam::Number(n) => Some(*n),
            RuleParam::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            RuleParam::Text(s) => Some(s.clone()),
            RuleParam::Number(n) => Some(format_number(*n)),
            _ => None,
        }
    }

    /// List items; comma-separated text is split
    pub fn items(&self) -> Vec<String> {
        match self {
            RuleParam::List(items) => items.iter().map(|i| i.to_string().trim().to_string()).collect(),
            RuleParam::Text(s) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            RuleParam::Number(n) => vec![format_number(*n)],
            RuleParam::Bool(_) => Vec::new(),
        }
    }
}

impl From<bool> for RuleParam {
    fn from(v: bool) -> Self {
        RuleParam::Bool(v)
    }
}

impl From<i32> for RuleParam {
    fn from(v: i32) -> Self {
        RuleParam::Number(v as f64)
    }
}

impl From<i64> for RuleParam {
    fn from(v: i64) -> Self {
        RuleParam::Number(v as f64)
    }
}

impl From<f64> for RuleParam {
    fn from(v: f64) -> Self {
        RuleParam::Number(v)
    }
}

impl From<&str> for RuleParam {
    fn from(v: &str) -> Self {
        RuleParam::Text(v.to_string())
    }
}

impl From<String> for RuleParam {
    fn from(v: String) -> Self {
        RuleParam::Text(v)
    }
}

impl From<Vec<&str>> for RuleParam {
    fn from(v: Vec<&str>) -> Self {
        RuleParam::List(v.into_iter().map(|s| ParamItem::Text(s.to_string())).collect())
    }
}

/// Format a number without a trailing `.0` for whole values
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
