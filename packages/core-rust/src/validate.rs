//! Document validator.
//!
//! Walks the [`RuleSet`] rather than the document, so required fields missing
//! from the document are reported. Document keys the schema does not declare are
//! tolerated; callers compare `field_count` with `document_field_count` (or use
//! [`unknown_fields`]) to spot schema drift.

use serde::{Deserialize, Serialize};

use crate::rules::RuleSet;
use crate::types::Document;

/// Outcome of validating one document against one rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// `true` iff `errors` is empty.
    pub is_valid: bool,
    /// Failure messages, in schema declaration order.
    pub errors: Vec<String>,
    /// Number of fields declared by the schema.
    pub field_count: usize,
    /// Number of keys present on the document.
    pub document_field_count: usize,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>, field_count: usize, document_field_count: usize) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            field_count,
            document_field_count,
        }
    }
}

/// Validates `document` against `rules`.
#[must_use]
pub fn validate(rules: &RuleSet, document: &Document) -> ValidationResult {
    let errors = rules
        .iter()
        .filter_map(|rule| rule.check(document.get(rule.field())).err())
        .collect();
    ValidationResult::from_errors(errors, rules.len(), document.len())
}

/// Document keys with no matching schema field, in document order.
#[must_use]
pub fn unknown_fields<'a>(rules: &RuleSet, document: &'a Document) -> Vec<&'a str> {
    document
        .keys()
        .filter(|key| !rules.contains(key))
        .map(String::as_str)
        .collect()
}
