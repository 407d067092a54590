//! Port traits implemented by infrastructure crates.
//!
//! The client depends only on [`Transport`]; the `transport` crate supplies
//! the HTTP implementation. Tests substitute scripted implementations.

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::types::{FeedRequest, HttpResponse};

/// Performs one HTTP exchange.
///
/// Implementations return `Ok` for every response that was received,
/// whatever its status, and `Err` only when no response was obtained.
/// Retries, TLS and connection pooling are the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response.
    async fn execute(&self, request: &FeedRequest) -> Result<HttpResponse, TransportError>;
}
