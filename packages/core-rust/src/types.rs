use serde_json::{Map, Value};

/// A candidate document exactly as decoded from input: field name to JSON value.
///
/// Nothing about a `Document` is assumed to conform to a schema until it has been
/// run through [`validate`](crate::validate::validate). Keys keep their input order
/// (`serde_json` is built with `preserve_order`), which keeps round-trips and
/// diagnostics deterministic.
pub type Document = Map<String, Value>;

/// Identifier of a stored document (the string value of its `"id"` field).
pub type DocumentId = String;

/// Name of the field that carries a document's identifier.
pub const ID_FIELD: &str = "id";

/// Returns the document's identifier if it has a string `"id"` field.
#[must_use]
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Human-readable JSON kind name, used in diagnostics.
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
