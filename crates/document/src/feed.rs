//! Decoding of JSON feed files into [`Document`] operations.
//!
//! A feed is either a JSON array of operations or a sequence of JSON objects
//! separated by whitespace (one per line, typically). Each operation names its
//! document under exactly one of `put`, `update` or `remove`:
//!
//! ```json
//! {"put": "id:ns:type::doc1", "fields": {"title": "hello"}}
//! {"update": "id:ns:type::doc1", "create": true, "fields": {"title": {"assign": "hi"}}}
//! {"remove": "id:ns:type::doc1", "condition": "type.title == \"hi\""}
//! ```
//!
//! The body sent for puts and updates is `{"fields": ...}`.

use std::io::Read;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::DecodeError;
use crate::identifiers::DocumentId;
use crate::types::{Document, Operation};

#[derive(Debug, Deserialize)]
struct RawOperation {
    put: Option<String>,
    update: Option<String>,
    remove: Option<String>,
    condition: Option<String>,
    #[serde(default)]
    create: bool,
    fields: Option<Value>,
}

/// Decodes every operation in `reader`.
pub fn decode(reader: impl Read) -> Result<Vec<Document>, DecodeError> {
    let mut documents = Vec::new();
    for value in serde_json::Deserializer::from_reader(reader).into_iter::<Value>() {
        let items = match value? {
            Value::Array(items) => items,
            item => vec![item],
        };
        for item in items {
            let index = documents.len();
            documents.push(decode_operation(item, index)?);
        }
    }
    Ok(documents)
}

/// Decodes every operation in `text`.
pub fn decode_str(text: &str) -> Result<Vec<Document>, DecodeError> {
    decode(text.as_bytes())
}

fn decode_operation(value: Value, index: usize) -> Result<Document, DecodeError> {
    let raw: RawOperation = serde_json::from_value(value)?;
    let (operation, id) = match (raw.put, raw.update, raw.remove) {
        (Some(id), None, None) => (Operation::Put, id),
        (None, Some(id), None) => (Operation::Update, id),
        (None, None, Some(id)) => (Operation::Remove, id),
        _ => return Err(DecodeError::MissingOperation { index }),
    };
    let id: DocumentId = id
        .parse()
        .map_err(|source| DecodeError::InvalidId { index, source })?;

    let body = match (operation, raw.fields) {
        (Operation::Remove, _) => Vec::new(),
        (_, Some(fields)) => serde_json::to_vec(&serde_json::json!({ "fields": fields }))?,
        (_, None) => {
            return Err(DecodeError::MissingFields {
                index,
                operation: operation.to_string(),
            })
        }
    };
    Ok(Document {
        id,
        operation: Some(operation),
        create_if_missing: raw.create,
        condition: raw.condition,
        body,
    })
}
