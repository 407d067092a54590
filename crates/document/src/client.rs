//! The document feed client.
//!
//! [`Client`] composes the [`RequestBuilder`], a [`Transport`] and the
//! [`StatsAggregator`] into one call per document operation. It keeps no
//! per-call state; share one instance (e.g. behind an `Arc`) between all
//! concurrent callers so their calls land in the same statistics.

use std::sync::Arc;

use tracing::Instrument;

use crate::clock::{Clock, SystemClock};
use crate::config::{ClientOptions, QueryParams};
use crate::errors::{BuildError, FeedError};
use crate::identifiers::DocumentId;
use crate::ports::Transport;
use crate::request::RequestBuilder;
use crate::stats::{Outcome, Stats, StatsAggregator};
use crate::types::{Document, FeedRequest, SendResult};

/// Sends document operations and accounts for every call.
pub struct Client {
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    stats: StatsAggregator,
}

impl Client {
    /// Creates a client measuring latency with the system clock.
    pub fn new(options: ClientOptions, transport: Arc<dyn Transport>) -> Result<Self, BuildError> {
        Self::with_clock(options, transport, Arc::new(SystemClock))
    }

    /// Creates a client measuring latency with `clock`.
    pub fn with_clock(
        options: ClientOptions,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BuildError> {
        Ok(Self {
            builder: RequestBuilder::new(&options)?,
            transport,
            stats: StatsAggregator::new(clock),
        })
    }

    /// Returns the request builder used by this client.
    pub fn request_builder(&self) -> &RequestBuilder {
        &self.builder
    }

    /// Sends a feed operation.
    ///
    /// Returns `Err` only if the request cannot be built, in which case
    /// nothing is sent or counted. Transport failures and non-2xx responses
    /// are reported in the returned [`SendResult`].
    pub async fn send(&self, document: &Document) -> Result<SendResult, BuildError> {
        self.send_with_params(document, &QueryParams::new()).await
    }

    /// Sends a feed operation with additional query parameters for this call.
    pub async fn send_with_params(
        &self,
        document: &Document,
        params: &QueryParams,
    ) -> Result<SendResult, BuildError> {
        let request = self.builder.build(document, params)?;
        Ok(self.execute(&document.id, request).await)
    }

    /// Fetches a document.
    pub async fn get(&self, id: &DocumentId) -> Result<SendResult, BuildError> {
        self.get_with_params(id, &QueryParams::new()).await
    }

    /// Fetches a document with additional query parameters for this call.
    pub async fn get_with_params(
        &self,
        id: &DocumentId,
        params: &QueryParams,
    ) -> Result<SendResult, BuildError> {
        let request = self.builder.build_get(id, params)?;
        Ok(self.execute(id, request).await)
    }

    /// Returns a consistent snapshot of the statistics of all calls so far.
    pub fn stats(&self) -> Stats {
        self.stats.snapshot()
    }

    async fn execute(&self, id: &DocumentId, request: FeedRequest) -> SendResult {
        let span = tracing::debug_span!("document_call", method = %request.method, id = %id);
        async {
            // Completed below; if this future is dropped first, the guard
            // records the call as failed.
            let call = self.stats.track(request.body.len() as u64);
            match self.transport.execute(&request).await {
                Ok(response) => {
                    let latency = call.complete(Outcome::Success {
                        status: response.status,
                        bytes_received: response.body.len() as u64,
                    });
                    let error = if response.is_success() {
                        tracing::debug!(status = response.status, ?latency, "document operation succeeded");
                        None
                    } else {
                        tracing::warn!(status = response.status, ?latency, "document operation rejected");
                        Some(FeedError::Remote {
                            status: response.status,
                            body: String::from_utf8_lossy(&response.body).into_owned(),
                        })
                    };
                    SendResult {
                        id: id.clone(),
                        method: request.method,
                        status: Some(response.status),
                        latency,
                        body: Some(response.body),
                        error,
                    }
                }
                Err(err) => {
                    let latency = call.complete(Outcome::Failure);
                    tracing::warn!(error = %err, ?latency, "document call failed without a response");
                    SendResult {
                        id: id.clone(),
                        method: request.method,
                        status: None,
                        latency,
                        body: None,
                        error: Some(err.into()),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.builder.base_url().as_str())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
