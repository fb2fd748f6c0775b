//! Naming resolver.
//!
//! Derives every identifier form the templates need (singular/plural,
//! Pascal/camel/snake/kebab, human labels) from a raw user-supplied name.
//! Results are memoized in a [`NameCache`] that is safe to share between
//! concurrent generation runs.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use super::utils::{to_camel_case, to_kebab_case, to_pascal_case, to_snake_case, to_title_case};
use crate::error::GenerationError;

/// (singular, plural) pairs that do not follow the suffix rules
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
    ("category", "categories"),
    ("menu", "menus"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("knife", "knives"),
    ("wife", "wives"),
    ("half", "halves"),
    ("quiz", "quizzes"),
    ("criterion", "criteria"),
    ("analysis", "analyses"),
    ("cactus", "cacti"),
];

const UNCOUNTABLE: &[&str] = &[
    "sheep",
    "fish",
    "deer",
    "series",
    "species",
    "news",
    "equipment",
    "information",
    "metadata",
];

/// Singular words ending in `s` that the suffix rules would strip
const SINGULAR_S: &[&str] = &[
    "alias", "atlas", "axis", "basis", "bias", "canvas", "chaos", "christmas", "cosmos", "crisis",
    "ethos", "gas", "iris", "kudos", "lens", "pancreas", "tennis", "thesis",
];

/// Words whose plural `-ies` keeps the `ie` instead of going back to `y`
const IE_WORDS: &[&str] = &[
    "auntie", "brownie", "calorie", "cookie", "freebie", "genie", "goalie", "hippie", "lie",
    "movie", "pie", "prairie", "rookie", "selfie", "smoothie", "tie", "zombie",
];

/// Words ending in `-e` after a sibilant, whose plural only adds `s`
const SIBILANT_E_WORDS: &[&str] = &[
    "abuse", "avalanche", "cache", "cause", "cliche", "excuse", "fuse", "headache", "muse",
    "niche", "refuse", "ruse", "use",
];

/// Words that cannot name a generated class
const RESERVED_WORDS: &[&str] = &[
    "abstract", "and", "array", "as", "break", "callable", "case", "catch", "class", "clone",
    "const", "continue", "declare", "default", "do", "echo", "else", "elseif", "empty", "enum",
    "eval", "exit", "extends", "final", "finally", "fn", "for", "foreach", "function", "global",
    "goto", "if", "implements", "include", "instanceof", "insteadof", "interface", "isset",
    "list", "match", "namespace", "new", "or", "print", "private", "protected", "public",
    "readonly", "require", "return", "static", "switch", "throw", "trait", "try", "unset", "use",
    "var", "while", "xor", "yield", "model", "controller", "request", "resource",
];

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_ ]+$").expect("identifier regex is valid"))
}

fn consonant_y_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^aeiou]y$").expect("plural regex is valid"))
}

fn sibilant_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(s|x|z|ch|sh)$").expect("plural regex is valid"))
}

fn sibilant_stem_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(ss|us|x|z|ch|sh)$").expect("singular regex is valid"))
}

fn singular_s_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(ss|us|is)$").expect("singular regex is valid"))
}

/// Check that a raw name can be turned into identifiers.
///
/// Fails when the name is empty, starts with a digit, contains characters
/// outside `[A-Za-z0-9_ ]`, or has no letters at all.
pub fn validate_identifier(raw: &str, context: &str) -> Result<(), GenerationError> {
    let invalid = |reason: &'static str| GenerationError::InvalidIdentifier {
        raw: raw.to_string(),
        context: context.to_string(),
        reason,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("name is empty"));
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid("name starts with a digit"));
    }
    if !identifier_regex().is_match(trimmed) {
        return Err(invalid("name contains characters outside [A-Za-z0-9_ ]"));
    }
    if !trimmed.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("name has no letters"));
    }
    Ok(())
}

/// Comparison key for field names (snake_case)
pub fn normalize_key(raw: &str) -> String {
    to_snake_case(raw.trim())
}

/// Comparison key for entity names (singular snake_case)
pub fn entity_key(raw: &str) -> String {
    singularize(&normalize_key(raw))
}

/// Split off the last word of a snake/space separated name
fn split_last_word(word: &str) -> (&str, &str) {
    match word.rfind(['_', ' ']) {
        Some(idx) => (&word[..=idx], &word[idx + 1..]),
        None => ("", word),
    }
}

fn match_capitalization(original: &str, inflected: String) -> String {
    if original.starts_with(|c: char| c.is_uppercase()) {
        let mut chars = inflected.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => inflected,
        }
    } else {
        inflected
    }
}

/// Pluralize the last word of a name
///
/// # Example
///
/// ```
/// use schemaforge::codegen::naming::pluralize;
///
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("person"), "people");
/// assert_eq!(pluralize("order_item"), "order_items");
/// ```
pub fn pluralize(word: &str) -> String {
    let (prefix, last) = split_last_word(word);
    let lower = last.to_lowercase();
    format!("{}{}", prefix, match_capitalization(last, pluralize_word(&lower)))
}

/// Singularize the last word of a name
///
/// # Example
///
/// ```
/// use schemaforge::codegen::naming::singularize;
///
/// assert_eq!(singularize("categories"), "category");
/// assert_eq!(singularize("people"), "person");
/// assert_eq!(singularize("addresses"), "address");
/// ```
pub fn singularize(word: &str) -> String {
    let (prefix, last) = split_last_word(word);
    let lower = last.to_lowercase();
    format!("{}{}", prefix, match_capitalization(last, singularize_word(&lower)))
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == word) {
        return word.to_string();
    }

    if consonant_y_regex().is_match(word) {
        format!("{}ies", &word[..word.len() - 1])
    } else if sibilant_regex().is_match(word) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

fn singularize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == word) {
        return singular.to_string();
    }
    if IRREGULAR.iter().any(|(singular, _)| *singular == word) {
        return word.to_string();
    }

    if SINGULAR_S.contains(&word) || singular_s_regex().is_match(word) {
        return word.to_string();
    }

    let stripped = if let Some(stem) = word.strip_suffix("ies").filter(|stem| !stem.is_empty()) {
        let ie = format!("{}ie", stem);
        if IE_WORDS.contains(&ie.as_str()) {
            ie
        } else {
            format!("{}y", stem)
        }
    } else if let Some(stem) = word.strip_suffix("es") {
        singularize_es(stem)
    } else if word.len() > 1 && word.ends_with('s') {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    };

    // "peoples" strips to "people", which is itself an irregular plural
    match IRREGULAR.iter().find(|(_, plural)| *plural == stripped) {
        Some((singular, _)) => singular.to_string(),
        None => stripped,
    }
}

/// Singular for a word ending in `es`, given the part before `es`.
///
/// `es` is only dropped where [`pluralize_word`] would have added it: after
/// a sibilant that is not the tail of a silent `-e` word.
fn singularize_es(stem: &str) -> String {
    let with_e = format!("{}e", stem);
    if stem.ends_with("ous") || SIBILANT_E_WORDS.contains(&with_e.as_str()) {
        with_e
    } else if SINGULAR_S.contains(&stem) || sibilant_stem_regex().is_match(stem) {
        stem.to_string()
    } else {
        with_e
    }
}

/// Every derived identifier form for one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameForms {
    /// Name exactly as the user typed it
    pub raw: String,
    pub snake: String,
    pub snake_plural: String,
    pub pascal: String,
    pub pascal_plural: String,
    pub camel: String,
    pub camel_plural: String,
    pub kebab: String,
    pub kebab_plural: String,
    pub label: String,
    pub label_plural: String,
}

impl NameForms {
    /// Build all forms from a snake_case base
    fn from_base(raw: &str, base: &str) -> Self {
        let plural = pluralize(base);
        NameForms {
            raw: raw.to_string(),
            snake: base.to_string(),
            pascal: to_pascal_case(base),
            pascal_plural: to_pascal_case(&plural),
            camel: to_camel_case(base),
            camel_plural: to_camel_case(&plural),
            kebab: to_kebab_case(base),
            kebab_plural: to_kebab_case(&plural),
            label: to_title_case(base),
            label_plural: to_title_case(&plural),
            snake_plural: plural,
        }
    }

    /// Forms for an entity: the base is the singularized name
    pub fn entity(raw: &str) -> Result<Self, GenerationError> {
        validate_identifier(raw, "entity name")?;
        let base = entity_key(raw);
        if RESERVED_WORDS.contains(&base.as_str()) {
            return Err(GenerationError::InvalidIdentifier {
                raw: raw.to_string(),
                context: "entity name".to_string(),
                reason: "name is reserved in generated code",
            });
        }
        Ok(Self::from_base(raw, &base))
    }

    /// Forms for a field: the base is the name as given
    pub fn field(raw: &str) -> Result<Self, GenerationError> {
        validate_identifier(raw, "field name")?;
        Ok(Self::from_base(raw, &normalize_key(raw)))
    }

    /// Forms for the project name
    pub fn project(raw: &str) -> Result<Self, GenerationError> {
        validate_identifier(raw, "schema name")?;
        Ok(Self::from_base(raw, &normalize_key(raw)))
    }

    /// Database table name
    pub fn table(&self) -> &str {
        &self.snake_plural
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NameKind {
    Entity,
    Field,
    Project,
}

/// Memoized name resolution.
///
/// Read-mostly: lookups take a shared lock, only misses take the write lock.
/// Failed resolutions are never cached.
#[derive(Debug, Default)]
pub struct NameCache {
    entries: RwLock<HashMap<(NameKind, String), Arc<NameForms>>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self, raw: &str) -> Result<Arc<NameForms>, GenerationError> {
        self.resolve(NameKind::Entity, raw)
    }

    pub fn field(&self, raw: &str) -> Result<Arc<NameForms>, GenerationError> {
        self.resolve(NameKind::Field, raw)
    }

    pub fn project(&self, raw: &str) -> Result<Arc<NameForms>, GenerationError> {
        self.resolve(NameKind::Project, raw)
    }

    /// Number of memoized names
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(&self, kind: NameKind, raw: &str) -> Result<Arc<NameForms>, GenerationError> {
        let key = (kind, raw.to_string());
        if let Some(forms) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(forms));
        }

        let forms = Arc::new(match kind {
            NameKind::Entity => NameForms::entity(raw)?,
            NameKind::Field => NameForms::field(raw)?,
            NameKind::Project => NameForms::project(raw)?,
        });

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(forms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_rules() {
        assert_eq!(pluralize("product"), "products");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("church"), "churches");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("company"), "companies");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("sheep"), "sheep");
        assert_eq!(pluralize("Person"), "People");
    }

    #[test]
    fn test_singularize_rules() {
        assert_eq!(singularize("products"), "product");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("horses"), "horse");
        assert_eq!(singularize("buses"), "bus");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("companies"), "company");
        assert_eq!(singularize("children"), "child");
        assert_eq!(singularize("peoples"), "person");
        assert_eq!(singularize("order_items"), "order_item");
        assert_eq!(singularize("houses"), "house");
        assert_eq!(singularize("warehouses"), "warehouse");
        assert_eq!(singularize("purchases"), "purchase");
        assert_eq!(singularize("cookies"), "cookie");
        assert_eq!(singularize("pies"), "pie");
        assert_eq!(singularize("canvases"), "canvas");
        assert_eq!(singularize("caches"), "cache");
        assert_eq!(singularize("menus"), "menu");
    }

    #[test]
    fn test_words_ending_in_s_stay_singular() {
        for word in ["canvas", "alias", "lens", "status", "address", "basis", "bus"] {
            assert_eq!(singularize(word), word);
            assert_eq!(singularize(&pluralize(word)), word, "{}", word);
        }
        assert_eq!(singularize("ideas"), "idea");
        assert_eq!(singularize("photos"), "photo");
    }

    #[test]
    fn test_suffix_round_trip() {
        let words = [
            "house", "warehouse", "case", "database", "response", "promise", "horse", "cookie",
            "pie", "movie", "company", "canvas", "alias", "lens", "cache", "cause", "bonus", "box",
            "church", "wish", "glass",
        ];
        for word in words {
            assert_eq!(singularize(&pluralize(word)), singularize(word), "{}", word);
            assert_eq!(singularize(word), word, "{}", word);
        }
    }

    #[test]
    fn test_irregular_round_trip() {
        for (singular, plural) in IRREGULAR {
            assert_eq!(pluralize(singular), *plural);
            assert_eq!(singularize(&pluralize(singular)), singularize(singular));
            assert_eq!(singularize(&pluralize(plural)), singularize(plural));
        }
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("Order Item", "entity").is_ok());
        assert!(validate_identifier("order_item2", "entity").is_ok());
        assert!(validate_identifier("", "entity").is_err());
        assert!(validate_identifier("  ", "entity").is_err());
        assert!(validate_identifier("2fast", "entity").is_err());
        assert!(validate_identifier("Order-Item", "entity").is_err());
        assert!(validate_identifier("___", "entity").is_err());
    }

    #[test]
    fn test_entity_forms() {
        let forms = NameForms::entity("Order Item").unwrap();
        assert_eq!(forms.pascal, "OrderItem");
        assert_eq!(forms.table(), "order_items");
        assert_eq!(forms.camel_plural, "orderItems");
        assert_eq!(forms.kebab_plural, "order-items");
        assert_eq!(forms.label_plural, "Order Items");
    }

    #[test]
    fn test_entity_forms_singularize_plural_input() {
        let forms = NameForms::entity("Categories").unwrap();
        assert_eq!(forms.pascal, "Category");
        assert_eq!(forms.table(), "categories");
    }

    #[test]
    fn test_entity_forms_keep_trailing_s() {
        let canvas = NameForms::entity("Canvas").unwrap();
        assert_eq!(canvas.pascal, "Canvas");
        assert_eq!(canvas.table(), "canvases");

        let warehouse = NameForms::entity("Warehouses").unwrap();
        assert_eq!(warehouse.pascal, "Warehouse");
        assert_eq!(warehouse.table(), "warehouses");
    }

    #[test]
    fn test_reserved_entity_name() {
        assert!(NameForms::entity("Class").is_err());
        assert!(NameForms::field("class").is_ok());
    }

    #[test]
    fn test_field_forms_keep_plural_names() {
        let forms = NameForms::field("tags").unwrap();
        assert_eq!(forms.snake, "tags");
        assert_eq!(forms.label, "Tags");
    }

    #[test]
    fn test_cache_memoizes_and_skips_errors() {
        let cache = NameCache::new();
        let a = cache.entity("Product").unwrap();
        let b = cache.entity("Product").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cache.entity("9bad").is_err());
        assert_eq!(cache.len(), 1);
    }
}
