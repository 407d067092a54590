//! DocFeed HTTP transport adapter.
//!
//! Implements the [`document::Transport`] trait with [`reqwest`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection pooling, TLS and socket timeouts live here.
//! The [`document`] crate sees only [`document::Transport`]: every response
//! is returned as-is, whatever its status, and only failures to obtain a
//! response are mapped to [`TransportError`].

use std::time::Duration;

use async_trait::async_trait;
use document::{FeedRequest, HttpResponse, Method, Transport, TransportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("docfeed/", env!("CARGO_PKG_VERSION"));

/// Socket-level settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Deadline for establishing a connection.
    pub connect_timeout: Option<Duration>,
    /// Deadline for a whole exchange, from sending to reading the body.
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            request_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// The transport could not be set up.
#[derive(Debug, Error)]
pub enum HttpTransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`Transport`] over HTTP/1.1, with rustls for `https` endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with its own connection pool.
    pub fn new(config: &TransportConfig) -> Result<Self, HttpTransportError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wraps an existing client, sharing its connection pool.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &FeedRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        tracing::trace!(method = %request.method, url = %request.url, "sending request");
        let response = builder.send().await.map_err(to_transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(to_transport_error)?;
        tracing::trace!(status, bytes = body.len(), "received response");

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn to_transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect {
            message: err.to_string(),
        }
    } else {
        TransportError::Io {
            message: err.to_string(),
        }
    }
}
