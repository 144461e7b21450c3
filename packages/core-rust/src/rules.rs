//! Type rule compiler.
//!
//! Turns a [`CollectionSchema`] into a [`RuleSet`]: one [`ValidationRule`] per
//! declared field, in declaration order. Independently, [`default_value`] maps a
//! [`FieldType`] to the blank value a form for that field starts from. Both are
//! exhaustive matches over the same enum, so a new field type has to be handled
//! in both places before the crate compiles.

use serde_json::{Map, Value};
use tracing::debug;

use crate::schema::{CollectionSchema, FieldDefinition, FieldType};
use crate::types::Document;

/// Compiled check for a single schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRule {
    field: String,
    field_type: FieldType,
    optional: bool,
}

impl ValidationRule {
    /// Compiles the rule for one field definition.
    #[must_use]
    pub fn for_field(def: &FieldDefinition) -> Self {
        Self {
            field: def.name.clone(),
            field_type: def.field_type.clone(),
            optional: def.optional,
        }
    }

    /// Name of the field this rule checks.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Applies the rule to the value present in a document (`None` when absent).
    ///
    /// JSON `null` counts as absent. No coercion is attempted: `"19.99"` is not a
    /// number.
    ///
    /// # Errors
    ///
    /// Returns the human-readable failure message for this field.
    pub fn check(&self, value: Option<&Value>) -> Result<(), String> {
        if let FieldType::Unsupported(name) = &self.field_type {
            return Err(format!(
                "field '{}' has unsupported field type '{name}'",
                self.field
            ));
        }

        let value = match value {
            None | Some(Value::Null) if self.optional => return Ok(()),
            None | Some(Value::Null) => {
                return Err(format!("field '{}' is required", self.field));
            }
            Some(value) => value,
        };

        if matches_type(&self.field_type, value) {
            Ok(())
        } else {
            Err(format!(
                "field '{}' must be {}",
                self.field,
                expectation(&self.field_type)
            ))
        }
    }
}

/// Ordered set of compiled rules for one schema.
///
/// Immutable once compiled; recompile when the schema changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<ValidationRule>,
}

impl RuleSet {
    /// Rules in schema declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationRule> {
        self.rules.iter()
    }

    /// Number of schema fields covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Looks up the rule for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&ValidationRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    /// Whether the schema declares `field`.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }
}

/// Compiles every field of `schema` into a [`RuleSet`].
///
/// Deterministic: compiling the same schema twice yields equal rule sets.
#[must_use]
pub fn compile(schema: &CollectionSchema) -> RuleSet {
    let rules: Vec<ValidationRule> = schema.fields.iter().map(ValidationRule::for_field).collect();
    debug!(
        collection = %schema.name,
        rules = rules.len(),
        "compiled validation rules"
    );
    RuleSet { rules }
}

/// Blank value a form for a field of this type starts from.
#[must_use]
pub fn default_value(field_type: &FieldType) -> Value {
    match field_type {
        FieldType::String => Value::String(String::new()),
        FieldType::Int32 | FieldType::Int64 => Value::from(0),
        FieldType::Float => Value::from(0.0),
        FieldType::Bool => Value::Bool(false),
        FieldType::StringArray
        | FieldType::Int32Array
        | FieldType::Int64Array
        | FieldType::FloatArray
        | FieldType::BoolArray
        | FieldType::ObjectArray => Value::Array(Vec::new()),
        FieldType::Object => Value::Object(Map::new()),
        FieldType::Auto | FieldType::Unsupported(_) => Value::Null,
    }
}

/// Form shape of a schema: every field mapped to its [`default_value`], in
/// declaration order.
#[must_use]
pub fn blank_document(schema: &CollectionSchema) -> Document {
    schema
        .fields
        .iter()
        .map(|f| (f.name.clone(), default_value(&f.field_type)))
        .collect()
}

fn matches_type(field_type: &FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Int32 | FieldType::Int64 | FieldType::Float => value.is_number(),
        FieldType::Bool => value.is_boolean(),
        FieldType::StringArray => all_elements(value, Value::is_string),
        FieldType::Int32Array | FieldType::Int64Array | FieldType::FloatArray => {
            all_elements(value, Value::is_number)
        }
        FieldType::BoolArray => all_elements(value, Value::is_boolean),
        FieldType::Object => value.is_object(),
        FieldType::ObjectArray => all_elements(value, Value::is_object),
        FieldType::Auto => true,
        FieldType::Unsupported(_) => false,
    }
}

fn all_elements(value: &Value, pred: fn(&Value) -> bool) -> bool {
    value.as_array().is_some_and(|items| items.iter().all(pred))
}

fn expectation(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::String => "a string",
        FieldType::Int32 | FieldType::Int64 | FieldType::Float => "a number",
        FieldType::Bool => "a boolean",
        FieldType::StringArray => "an array of strings",
        FieldType::Int32Array | FieldType::Int64Array | FieldType::FloatArray => {
            "an array of numbers"
        }
        FieldType::BoolArray => "an array of booleans",
        FieldType::Object => "an object",
        FieldType::ObjectArray => "an array of objects",
        FieldType::Auto => "any JSON value",
        FieldType::Unsupported(_) => "of a supported field type",
    }
}
