//! Client configuration.
//!
//! [`ClientOptions`] is plain data with serde support so that a composition
//! root can fill it from flags, environment variables or a config file.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default document API endpoint used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Query parameters, kept sorted by key so the wire form is deterministic.
pub type QueryParams = BTreeMap<String, String>;

/// Options shared by every call made through one [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Absolute base URL of the document API container, e.g.
    /// `https://example.com:1337`. May carry a path prefix.
    pub base_url: String,

    /// Server-side operation timeout, sent as `timeout=<ms>ms`.
    ///
    /// `None` (or zero) leaves the timeout to the server.
    pub timeout: Option<Duration>,

    /// Query parameters added to every request (e.g. a route).
    pub default_params: QueryParams,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            default_params: QueryParams::new(),
        }
    }
}

impl ClientOptions {
    /// Creates options for the given base URL with no timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the operation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a query parameter sent with every request.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_params.insert(key.into(), value.into());
        self
    }
}
