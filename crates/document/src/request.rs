//! Construction of document API requests.
//!
//! The request for a document is fully determined by the document, the
//! client options and any per-call query parameters. Query keys are emitted
//! in lexical order so the same input always produces the same wire request.

use std::time::Duration;

use url::form_urlencoded;
use url::Url;

use crate::config::{ClientOptions, QueryParams};
use crate::errors::BuildError;
use crate::identifiers::DocumentId;
use crate::types::{Document, FeedRequest, Method, Operation};

/// Builds [`FeedRequest`]s against one document API endpoint.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: Url,
    timeout: Option<Duration>,
    default_params: QueryParams,
}

impl RequestBuilder {
    /// Creates a builder from client options.
    ///
    /// Fails if the base URL is not an absolute `http`/`https` URL without a
    /// query or fragment.
    pub fn new(options: &ClientOptions) -> Result<Self, BuildError> {
        let invalid = |reason: &str| BuildError::InvalidBaseUrl {
            url: options.base_url.clone(),
            reason: reason.to_string(),
        };
        let base_url = Url::parse(&options.base_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base_url.query().is_some() || base_url.fragment().is_some() {
            return Err(invalid("must not carry a query or fragment"));
        }
        Ok(Self {
            base_url,
            timeout: options.timeout.filter(|t| !t.is_zero()),
            default_params: options.default_params.clone(),
        })
    }

    /// Returns the base URL requests are built against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the request for a feed operation.
    ///
    /// | Operation | Method | Body |
    /// |-----------|--------|------|
    /// | `None` (new document) | `POST` | document body |
    /// | `Put`, `Update` | `PUT` | document body |
    /// | `Remove` | `DELETE` | empty |
    pub fn build(&self, document: &Document, params: &QueryParams) -> Result<FeedRequest, BuildError> {
        let method = match document.operation {
            None => Method::Post,
            Some(Operation::Put | Operation::Update) => Method::Put,
            Some(Operation::Remove) => Method::Delete,
        };
        if method == Method::Delete && document.create_if_missing {
            return Err(BuildError::Unsupported {
                id: document.id.to_string(),
                reason: "create-if-missing cannot be combined with remove".to_string(),
            });
        }

        let mut query = QueryParams::new();
        if let Some(condition) = &document.condition {
            query.insert("condition".to_string(), condition.clone());
        }
        if document.create_if_missing {
            query.insert("create".to_string(), "true".to_string());
        }
        let body = match method {
            Method::Delete => Vec::new(),
            _ => document.body.clone(),
        };
        self.request(method, &document.id, query, params, body)
    }

    /// Builds the request that fetches a document.
    pub fn build_get(&self, id: &DocumentId, params: &QueryParams) -> Result<FeedRequest, BuildError> {
        self.request(Method::Get, id, QueryParams::new(), params, Vec::new())
    }

    fn request(
        &self,
        method: Method,
        id: &DocumentId,
        operation_params: QueryParams,
        call_params: &QueryParams,
        body: Vec<u8>,
    ) -> Result<FeedRequest, BuildError> {
        let mut query = self.default_params.clone();
        query.extend(operation_params);
        if let Some(timeout) = self.timeout {
            query.insert("timeout".to_string(), format!("{}ms", timeout.as_millis().max(1)));
        }
        query.extend(call_params.iter().map(|(k, v)| (k.clone(), v.clone())));

        let resource_path = id.resource_path();
        let prefix = self.base_url.path().trim_end_matches('/');
        let expected_path = format!("{prefix}{resource_path}");

        let mut raw = format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            resource_path
        );
        if !query.is_empty() {
            raw.push('?');
            raw.push_str(&encode_query(&query));
        }
        let url = Url::parse(&raw).map_err(|e| BuildError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if url.path() != expected_path {
            return Err(BuildError::UnrepresentablePath {
                id: id.to_string(),
                path: resource_path,
            });
        }

        let mut headers = Vec::new();
        if !body.is_empty() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        Ok(FeedRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Encodes query parameters as `application/x-www-form-urlencoded`, in key order.
fn encode_query(query: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
