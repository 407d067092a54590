//! User-facing summary of a call.
//!
//! [`OperationResult`] is what a front end prints: a success flag, a one-line
//! message, optional detail text and an optional payload. Formatting (colour,
//! layout) is left to the front end.

use serde::Serialize;

use crate::errors::FeedError;
use crate::types::{Method, SendResult};

/// Printable outcome of one document call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl OperationResult {
    fn success(message: String, payload: Option<String>) -> Self {
        Self {
            success: true,
            message,
            detail: None,
            payload,
        }
    }

    fn failure(message: String, detail: Option<String>, payload: Option<String>) -> Self {
        Self {
            success: false,
            message,
            detail,
            payload,
        }
    }
}

impl From<&SendResult> for OperationResult {
    fn from(result: &SendResult) -> Self {
        match &result.error {
            None if result.method == Method::Get => Self::success(
                format!("Read {}", result.id),
                result.body.as_deref().map(pretty_json),
            ),
            None => Self::success(format!("Sent {}", result.id), None),
            Some(FeedError::Transport(err)) => Self::failure(
                "Could not reach document API".to_string(),
                Some(err.to_string()),
                None,
            ),
            Some(FeedError::Remote { status, body }) if *status >= 500 => Self::failure(
                format!("Container error: {status}"),
                json_message(body),
                None,
            ),
            Some(FeedError::Remote { status, body }) => Self::failure(
                format!("Invalid document operation: {status}"),
                None,
                Some(pretty_json(body.as_bytes())),
            ),
        }
    }
}

/// Pretty-prints `body` if it is JSON; otherwise returns it as text.
fn pretty_json(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

/// Extracts the `message` field of a JSON error body.
fn json_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}
