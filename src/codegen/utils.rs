//! Utility functions for code generation.
//!
//! Casing helpers and literal escaping shared by the naming resolver and
//! the template context builders.

use convert_case::{Case, Casing};

/// Convert a string to snake_case
pub fn to_snake_case(s: &str) -> String {
    s.to_case(Case::Snake)
}

/// Convert a string to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    s.to_case(Case::Pascal)
}

/// Convert a string to camelCase
pub fn to_camel_case(s: &str) -> String {
    s.to_case(Case::Camel)
}

/// Convert a string to kebab-case
pub fn to_kebab_case(s: &str) -> String {
    s.to_case(Case::Kebab)
}

/// Convert a string to a space-separated, capitalized label
pub fn to_title_case(s: &str) -> String {
    s.to_case(Case::Title)
}

/// Escape a string for use inside a single-quoted PHP literal
pub fn escape_php_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Quote a string as a single-quoted PHP literal
pub fn php_string(s: &str) -> String {
    format!("'{}'", escape_php_string(s))
}

/// Escape a string for use inside a single-quoted JavaScript literal
pub fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Quote a string as a single-quoted JavaScript literal
pub fn js_string(s: &str) -> String {
    format!("'{}'", escape_js_string(s))
}

/// Escape text for an HTML attribute or element body
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_snake_case("OrderItem"), "order_item");
        assert_eq!(to_snake_case("Order Item"), "order_item");
        assert_eq!(to_pascal_case("order_item"), "OrderItem");
        assert_eq!(to_camel_case("order_item"), "orderItem");
        assert_eq!(to_kebab_case("order_item"), "order-item");
        assert_eq!(to_title_case("order_item"), "Order Item");
    }

    #[test]
    fn test_escape_php_string() {
        assert_eq!(escape_php_string("it's"), "it\\'s");
        assert_eq!(php_string("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_escape_js_string() {
        assert_eq!(escape_js_string("say 'hi'\n"), "say \\'hi\\'\\n");
        assert_eq!(js_string("a'b"), "'a\\'b'");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
