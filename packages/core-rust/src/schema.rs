//! Collection schema model.
//!
//! A [`CollectionSchema`] is the normalized, ordered list of [`FieldDefinition`]s
//! for one collection. Field types are a closed enum ([`FieldType`]); a type
//! string this crate does not recognize is kept as [`FieldType::Unsupported`]
//! rather than rejected at decode time, so that it reaches the rule compiler and
//! fails loudly there.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a collection field.
///
/// Serialized as the wire strings `"string"`, `"int32"`, `"string[]"`, ... .
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Int32,
    Int64,
    Float,
    Bool,
    StringArray,
    Int32Array,
    Int64Array,
    FloatArray,
    BoolArray,
    Object,
    ObjectArray,
    Auto,
    /// A type name this crate does not know. Compiles to an always-failing rule.
    Unsupported(String),
}

impl FieldType {
    /// Wire name of this type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::StringArray => "string[]",
            Self::Int32Array => "int32[]",
            Self::Int64Array => "int64[]",
            Self::FloatArray => "float[]",
            Self::BoolArray => "bool[]",
            Self::Object => "object",
            Self::ObjectArray => "object[]",
            Self::Auto => "auto",
            Self::Unsupported(name) => name,
        }
    }

    /// Whether this is a numeric scalar type (`int32`, `int64`, `float`).
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Float)
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "string" => Self::String,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float" => Self::Float,
            "bool" => Self::Bool,
            "string[]" => Self::StringArray,
            "int32[]" => Self::Int32Array,
            "int64[]" => Self::Int64Array,
            "float[]" => Self::FloatArray,
            "bool[]" => Self::BoolArray,
            "object" => Self::Object,
            "object[]" => Self::ObjectArray,
            "auto" => Self::Auto,
            _ => Self::Unsupported(name),
        }
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Unsupported(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single field definition within a collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFieldDefinition")]
pub struct FieldDefinition {
    /// Name of the field, unique within its schema.
    pub name: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field may be absent from a document.
    pub optional: bool,
    /// Whether the field is faceted by the store.
    pub facet: bool,
    /// Whether the field is indexed by the store.
    pub index: bool,
    /// Whether the field can be sorted on.
    pub sort: bool,
    /// Whether the store keeps the field's value on disk.
    pub store: bool,
}

impl FieldDefinition {
    /// Creates a required field with default flags for its type.
    pub fn new(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        let field_type = field_type.into();
        let sort = field_type.is_numeric();
        Self {
            name: name.into(),
            field_type,
            optional: false,
            facet: false,
            index: true,
            sort,
            store: true,
        }
    }

    /// Marks the field optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the field faceted.
    #[must_use]
    pub fn faceted(mut self) -> Self {
        self.facet = true;
        self
    }
}

/// Wire shape of a field definition before flag defaults are resolved.
///
/// `sort` defaults depend on the field type, so it cannot use a plain
/// `#[serde(default)]` on [`FieldDefinition`].
#[derive(Deserialize)]
struct RawFieldDefinition {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    facet: bool,
    #[serde(default = "default_true")]
    index: bool,
    #[serde(default)]
    sort: Option<bool>,
    #[serde(default = "default_true")]
    store: bool,
}

fn default_true() -> bool {
    true
}

impl From<RawFieldDefinition> for FieldDefinition {
    fn from(raw: RawFieldDefinition) -> Self {
        let sort = raw.sort.unwrap_or_else(|| raw.field_type.is_numeric());
        Self {
            name: raw.name,
            field_type: raw.field_type,
            optional: raw.optional,
            facet: raw.facet,
            index: raw.index,
            sort,
            store: raw.store,
        }
    }
}

/// Ordered field definitions of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Collection name.
    pub name: String,
    /// Field definitions in declaration order.
    pub fields: Vec<FieldDefinition>,
    /// Numeric field used as the store's default sort key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sorting_field: Option<String>,
    /// Whether the store indexes nested object fields.
    #[serde(default)]
    pub enable_nested_fields: bool,
}

impl CollectionSchema {
    /// Creates a schema with the given fields and no sorting field.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
            default_sorting_field: None,
            enable_nested_fields: false,
        }
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks the schema invariants: a non-empty name, unique field names, and a
    /// `default_sorting_field` that names a numeric field of this schema.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }

        if let Some(sorting) = &self.default_sorting_field {
            let field = self
                .field(sorting)
                .ok_or_else(|| SchemaError::UnknownSortingField(sorting.clone()))?;
            if !field.field_type.is_numeric() {
                return Err(SchemaError::NonNumericSortingField {
                    field: sorting.clone(),
                    field_type: field.field_type.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// A schema as fetched from the store, tagged with the store's version counter.
///
/// The version increases every time the store replaces the collection's schema.
/// Cached snapshots go stale; the version lets callers tell two fetches apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub version: u64,
    pub schema: CollectionSchema,
}

/// Violations of the [`CollectionSchema`] invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("collection name must not be empty")]
    EmptyName,
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),
    #[error("default sorting field '{0}' is not declared in the schema")]
    UnknownSortingField(String),
    #[error("default sorting field '{field}' must be numeric, found '{field_type}'")]
    NonNumericSortingField { field: String, field_type: String },
}
