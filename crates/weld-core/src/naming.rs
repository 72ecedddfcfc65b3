//! Destination schema naming
//!
//! Turns free text (an integration id, a user-typed label) into a schema name
//! the warehouse accepts: word characters separated by single underscores.

use regex::Regex;
use std::sync::OnceLock;

fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid regex"))
}

fn repeated_underscores() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"__+").expect("valid regex"))
}

/// Derive a destination schema name from free text
///
/// Trims, replaces every non-word character with `_`, collapses repeated
/// underscores and strips them from both ends.
pub fn destination_schema_name(input: &str) -> String {
    let replaced = non_word().replace_all(input.trim(), "_");
    let collapsed = repeated_underscores().replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_and_spaces() {
        assert_eq!(destination_schema_name("My Schema!! 2024"), "My_Schema_2024");
    }

    #[test]
    fn test_leading_underscores() {
        assert_eq!(destination_schema_name("__leading"), "leading");
        assert_eq!(destination_schema_name("trailing--"), "trailing");
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(destination_schema_name(""), "");
        assert_eq!(destination_schema_name("   "), "");
        assert_eq!(destination_schema_name("!!!"), "");
    }

    #[test]
    fn test_integration_ids() {
        assert_eq!(destination_schema_name("google-sheets"), "google_sheets");
        assert_eq!(destination_schema_name("  hubspot  "), "hubspot");
        assert_eq!(destination_schema_name("already_ok"), "already_ok");
    }

    #[test]
    fn test_non_ascii_becomes_separator() {
        assert_eq!(destination_schema_name("café orders"), "caf_orders");
    }

    #[test]
    fn test_idempotent() {
        let once = destination_schema_name("a  b__c..d");
        assert_eq!(once, "a_b_c_d");
        assert_eq!(destination_schema_name(&once), once);
    }
}
