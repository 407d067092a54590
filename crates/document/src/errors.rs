//! Error and retry-advice types for the document feed client.
//!
//! The taxonomy follows where a failure happens:
//!
//! - [`ParseError`]: identifier text is malformed. Never retried.
//! - [`BuildError`]: a request could not be constructed. Never retried.
//! - [`TransportError`]: no HTTP response was obtained. Counted as an error
//!   in the call statistics.
//! - [`FeedError`]: the per-call failure carried by a
//!   [`SendResult`](crate::SendResult): either a transport failure or a valid
//!   response with a non-2xx status.
//! - [`DecodeError`]: a JSON feed could not be decoded into documents.
//!
//! The client never retries on its own. [`RetryPolicy`] is advice for callers
//! that implement their own retry loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether a failed call is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means the caller's
        /// own back-off schedule applies.
        after: Option<Duration>,
    },
    /// The operation must not be retried without changing the request.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Identifier errors
// ---------------------------------------------------------------------------

/// Malformed document identifier text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text does not start with the `id:` scheme.
    #[error("invalid document id '{id}': must start with 'id:'")]
    MissingScheme { id: String },

    /// The text has fewer than the four `:`-separated fields after the scheme.
    #[error("invalid document id '{id}': expected id:<namespace>:<type>:<selector>:<user-specific>")]
    MissingFields { id: String },

    #[error("invalid document id '{id}': namespace is empty")]
    EmptyNamespace { id: String },

    #[error("invalid document id '{id}': document type is empty")]
    EmptyType { id: String },

    #[error("invalid document id '{id}': user-specific part is empty")]
    EmptyUserSpecific { id: String },

    /// The selector is neither empty, `n=<number>`, nor `g=<group>`.
    #[error("invalid document id '{id}': unknown selector '{selector}'")]
    InvalidSelector { id: String, selector: String },

    #[error("invalid document id '{id}': '{value}' is not a valid number")]
    InvalidNumber { id: String, value: String },

    #[error("invalid document id '{id}': group is empty")]
    EmptyGroup { id: String },

    /// A part other than the user-specific one contains the `:` separator.
    #[error("invalid document id '{id}': {part} must not contain ':'")]
    SeparatorInPart { id: String, part: &'static str },
}

// ---------------------------------------------------------------------------
// Request construction errors
// ---------------------------------------------------------------------------

/// A request could not be constructed for a document operation.
///
/// This always indicates a caller bug or an unsupported combination; nothing
/// is sent and nothing is counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The configured base URL is not an absolute URL.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The assembled request URL failed to parse.
    #[error("invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The identifier cannot be carried as a URL path without being altered
    /// by path normalisation (e.g. a `..` segment).
    #[error("document id '{id}' cannot be represented as the path '{path}'")]
    UnrepresentablePath { id: String, path: String },

    /// The operation does not support the requested options.
    #[error("unsupported operation for '{id}': {reason}")]
    Unsupported { id: String, reason: String },
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// No HTTP response was obtained for a call.
///
/// Returned by [`Transport`](crate::Transport) implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The call did not complete within its deadline.
    #[error("request timed out")]
    Timeout,

    /// A connection to the endpoint could not be established.
    #[error("connection failed: {message}")]
    Connect { message: String },

    /// Any other I/O or protocol failure before a response was read.
    #[error("transport failure: {message}")]
    Io { message: String },

    /// The call was abandoned before it completed.
    #[error("request cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Per-call failures
// ---------------------------------------------------------------------------

/// Why a single document operation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response was received, but its status is not 2xx.
    #[error("document operation failed with status {status}")]
    Remote {
        /// HTTP status code of the response.
        status: u16,
        /// Response body as received (lossily decoded as UTF-8).
        body: String,
    },
}

impl FeedError {
    /// Returns the HTTP status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(_) => None,
            Self::Remote { status, .. } => Some(*status),
        }
    }

    /// Returns `true` for failures where no response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Advice on whether the caller may retry this operation unchanged.
    ///
    /// Transport failures and overload statuses (429, 503, 504) are
    /// retryable. Any other status means the store rejected the operation
    /// and the same request would fail again.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport(TransportError::Cancelled) => RetryPolicy::NonRetryable,
            Self::Transport(_) => RetryPolicy::Retryable { after: None },
            Self::Remote {
                status: 429 | 503 | 504,
                ..
            } => RetryPolicy::Retryable { after: None },
            Self::Remote { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Feed decoding errors
// ---------------------------------------------------------------------------

/// A JSON feed could not be decoded into document operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input is not valid JSON.
    #[error("invalid JSON in feed: {0}")]
    Json(#[from] serde_json::Error),

    /// An operation object does not name exactly one of put, update or remove.
    #[error("operation #{index}: expected exactly one of 'put', 'update' or 'remove'")]
    MissingOperation { index: usize },

    /// A put or update operation has no `fields` object.
    #[error("operation #{index}: missing 'fields' for {operation}")]
    MissingFields { index: usize, operation: String },

    /// The operation's document id is invalid.
    #[error("operation #{index}: {source}")]
    InvalidId {
        index: usize,
        #[source]
        source: ParseError,
    },
}
