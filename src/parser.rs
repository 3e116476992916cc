use crate::ir::FlowDocument;
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("input is empty")]
    Empty,
    #[error("document root must be a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("malformed flow document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses a flow document.
///
/// Strict JSON is tried first. Documents produced by a language model often carry
/// trailing commas or comments, so a JSON5 parse is attempted before giving up; the
/// strict parser's error is reported when both fail.
pub fn parse_document(input: &str) -> Result<FlowDocument, DocumentError> {
    let trimmed = input.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(DocumentError::Empty);
    }

    let value = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => value,
        Err(strict_err) => match json5::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => {
                warn!("flow document is not strict JSON, accepted as JSON5");
                value
            }
            Err(_) => return Err(DocumentError::Json(strict_err)),
        },
    };

    if !value.is_object() {
        return Err(DocumentError::NotAnObject(json_kind(&value)));
    }

    let document: FlowDocument = serde_json::from_value(value)?;
    debug!(
        "parsed flow document: {} actors, {} phases, {} tasks, {} gateways, {} flows",
        document.actors.len(),
        document.phases.len(),
        document.tasks.len(),
        document.gateways.len(),
        document.flows.len()
    );
    Ok(document)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
