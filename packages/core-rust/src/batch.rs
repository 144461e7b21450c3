//! Batch parser.
//!
//! Decodes an uploaded or pasted batch into candidate documents, or a block of
//! text into document identifiers. Parsing is all-or-nothing: one bad line or
//! element fails the whole batch, and the error names where it happened.
//!
//! Supported encodings:
//! ```text
//! docs.json    [{"id": "a1", "price": 1.5}, {"id": "a2", "price": 2.0}]
//! docs.jsonl   {"id": "a1", "price": 1.5}
//!              {"id": "a2", "price": 2.0}
//! ids (text)   a1
//!              a2
//! ids (array)  ["a1", "a2"]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::types::{document_id, json_kind, Document, DocumentId};

/// Encoding of a document batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFormat {
    /// A single JSON array of objects (`.json`).
    Json,
    /// One JSON object per non-empty line (`.jsonl`).
    Jsonl,
}

impl BatchFormat {
    /// Selects the format from a file name's extension.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::UnsupportedFormat`] for anything but `.json` and `.jsonl`.
    pub fn from_file_name(file_name: &str) -> Result<Self, BatchError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("jsonl") => Ok(Self::Jsonl),
            _ => Err(BatchError::UnsupportedFormat {
                file_name: file_name.to_string(),
            }),
        }
    }

    /// Guesses the format of pasted text: a leading `[` means a JSON array.
    #[must_use]
    pub fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('[') {
            Self::Json
        } else {
            Self::Jsonl
        }
    }
}

/// Raw batch as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawBatchInput {
    /// An uploaded file; the format comes from the file name's extension.
    #[serde(rename_all = "camelCase")]
    File { file_name: String, content: String },
    /// Pasted text; the format is sniffed from the content.
    Text { content: String },
}

impl RawBatchInput {
    pub fn file(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::File {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Raw content regardless of origin.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::File { content, .. } | Self::Text { content } => content,
        }
    }
}

/// Errors from decoding a batch. Each one is fatal to the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("unsupported file format: '{file_name}' (expected .json or .jsonl)")]
    UnsupportedFormat { file_name: String },
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("invalid JSON on line {line}: {source}")]
    InvalidJsonLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("expected a JSON array of documents, found {found}")]
    NotAnArray { found: &'static str },
    #[error("element {index} is not a JSON object (found {found})")]
    ElementNotObject { index: usize, found: &'static str },
    #[error("line {line} is not a JSON object (found {found})")]
    LineNotObject { line: usize, found: &'static str },
    #[error("failed to read batch file: {0}")]
    Io(#[from] std::io::Error),
}

/// Decodes a raw batch into candidate documents, in input order.
///
/// Blank content decodes to an empty batch; rejecting empty batches is the
/// caller's decision.
///
/// # Errors
///
/// Returns the first decoding failure; no partial batch is returned.
pub fn parse(input: &RawBatchInput) -> Result<Vec<Document>, BatchError> {
    let format = match input {
        RawBatchInput::File { file_name, .. } => BatchFormat::from_file_name(file_name)?,
        RawBatchInput::Text { content } => BatchFormat::sniff(content),
    };
    parse_as(format, input.content())
}

/// Decodes `content` in the given format.
///
/// # Errors
///
/// Returns the first decoding failure.
pub fn parse_as(format: BatchFormat, content: &str) -> Result<Vec<Document>, BatchError> {
    let docs = match format {
        BatchFormat::Json => parse_json_array(content)?,
        BatchFormat::Jsonl => parse_jsonl(content)?,
    };
    debug!(?format, documents = docs.len(), "parsed batch");
    Ok(docs)
}

fn parse_json_array(content: &str) -> Result<Vec<Document>, BatchError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(content).map_err(BatchError::InvalidJson)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(BatchError::NotAnArray {
                found: json_kind(&other),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(BatchError::ElementNotObject {
                index: i + 1,
                found: json_kind(&other),
            }),
        })
        .collect()
}

fn parse_jsonl(content: &str) -> Result<Vec<Document>, BatchError> {
    let mut docs = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|source| {
            BatchError::InvalidJsonLine {
                line: line_no,
                source,
            }
        })?;
        match value {
            Value::Object(map) => docs.push(map),
            other => {
                return Err(BatchError::LineNotObject {
                    line: line_no,
                    found: json_kind(&other),
                })
            }
        }
    }
    Ok(docs)
}

/// Splits newline-delimited identifiers, trimming each and dropping blank lines.
#[must_use]
pub fn parse_ids(text: &str) -> Vec<DocumentId> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Decodes the identifiers of a delete batch.
///
/// A JSON array (a `.json` file, or pasted text starting with `[`) may hold
/// plain string ids, documents, or a mix; a document contributes its `"id"`
/// (`None` when it has no string id). A `.jsonl` file is decoded as
/// documents. Other pasted text and any other file are read as one
/// identifier per line.
///
/// # Errors
///
/// Fails only when JSON content does not decode.
pub fn parse_id_batch(input: &RawBatchInput) -> Result<Vec<Option<DocumentId>>, BatchError> {
    let format = match input {
        RawBatchInput::File { file_name, .. } => BatchFormat::from_file_name(file_name).ok(),
        RawBatchInput::Text { content } => {
            Some(BatchFormat::sniff(content)).filter(|f| *f == BatchFormat::Json)
        }
    };
    let ids = match format {
        Some(BatchFormat::Json) => parse_id_array(input.content())?,
        Some(BatchFormat::Jsonl) => parse_jsonl(input.content())?
            .iter()
            .map(|doc| document_id(doc).map(ToString::to_string))
            .collect(),
        None => parse_ids(input.content()).into_iter().map(Some).collect(),
    };
    debug!(?format, ids = ids.len(), "parsed delete batch");
    Ok(ids)
}

fn parse_id_array(content: &str) -> Result<Vec<Option<DocumentId>>, BatchError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(content).map_err(BatchError::InvalidJson)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(BatchError::NotAnArray {
                found: json_kind(&other),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(id) => {
                let id = id.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Value::Object(doc) => Ok(document_id(&doc).map(ToString::to_string)),
            other => Err(BatchError::ElementNotObject {
                index: i + 1,
                found: json_kind(&other),
            }),
        })
        .collect()
}

/// Reads a batch file from disk, choosing the format from its extension.
///
/// # Errors
///
/// Fails on an unsupported extension, an I/O error, or malformed content.
pub fn read_batch_file(path: impl AsRef<Path>) -> Result<Vec<Document>, BatchError> {
    let path = path.as_ref();
    let format = BatchFormat::from_file_name(&path.to_string_lossy())?;
    let content = fs::read_to_string(path)?;
    parse_as(format, &content)
}

/// Serializes documents as a single JSON array.
#[must_use]
pub fn to_json_array(docs: &[Document]) -> String {
    Value::Array(docs.iter().cloned().map(Value::Object).collect()).to_string()
}

/// Serializes documents as JSON lines, one object per line.
#[must_use]
pub fn to_jsonl(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| Value::Object(d.clone()).to_string() + "\n")
        .collect()
}
