//! Shared value types for document operations.
//!
//! [`Document`] is what callers hand to the client; [`FeedRequest`] and
//! [`HttpResponse`] cross the [`Transport`](crate::Transport) port;
//! [`SendResult`] is what the client hands back for every call.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::FeedError;
use crate::identifiers::DocumentId;

// ---------------------------------------------------------------------------
// Operations and documents
// ---------------------------------------------------------------------------

/// A feed operation applied to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Write the whole document, replacing any existing version.
    Put,
    /// Apply a partial update to an existing document.
    Update,
    /// Remove the document.
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Put => "put",
            Self::Update => "update",
            Self::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// A document operation to send to the document API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The document this operation applies to.
    pub id: DocumentId,

    /// The operation. `None` posts a new document.
    pub operation: Option<Operation>,

    /// Create the document if it does not exist (`create=true`).
    pub create_if_missing: bool,

    /// Test-and-set condition the stored document must satisfy.
    pub condition: Option<String>,

    /// Opaque JSON payload. Not sent for removes.
    pub body: Vec<u8>,
}

impl Document {
    /// Creates a new-document operation (sent as `POST`).
    pub fn new(id: DocumentId, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            operation: None,
            create_if_missing: false,
            condition: None,
            body: body.into(),
        }
    }

    /// Creates a put operation.
    pub fn put(id: DocumentId, body: impl Into<Vec<u8>>) -> Self {
        Self {
            operation: Some(Operation::Put),
            ..Self::new(id, body)
        }
    }

    /// Creates an update operation.
    pub fn update(id: DocumentId, body: impl Into<Vec<u8>>) -> Self {
        Self {
            operation: Some(Operation::Update),
            ..Self::new(id, body)
        }
    }

    /// Creates a remove operation.
    pub fn remove(id: DocumentId) -> Self {
        Self {
            operation: Some(Operation::Remove),
            ..Self::new(id, Vec::new())
        }
    }

    /// Sets `create_if_missing`.
    #[must_use]
    pub fn with_create(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sets the test-and-set condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// HTTP methods used by the document API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns the method as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully constructed request, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub method: Method,
    /// Absolute URL including the sorted, encoded query string.
    pub url: url::Url,
    /// Header name/value pairs, in the order they should be sent.
    pub headers: Vec<(String, String)>,
    /// Request body. Empty for `GET` and `DELETE`.
    pub body: Vec<u8>,
}

/// A response obtained from the document API, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response from a status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Call results
// ---------------------------------------------------------------------------

/// Outcome of one call through the client.
///
/// A call fails either because no response was received
/// ([`FeedError::Transport`]) or because the response status is not 2xx
/// ([`FeedError::Remote`]). Both are reported here, never as an `Err` from
/// the client; only request construction failures are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// The document the call was about.
    pub id: DocumentId,
    /// The method that was sent.
    pub method: Method,
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Time from issuing the call to its completion, as seen by the clock.
    pub latency: Duration,
    /// Response body, if a response was received.
    pub body: Option<Vec<u8>>,
    /// Why the operation did not succeed. `None` on success.
    pub error: Option<FeedError>,
}

impl SendResult {
    /// Returns `true` if the document operation succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the response body decoded as UTF-8 (lossily).
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_deref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }
}
