//! Core of the DocFeed document client.
//!
//! This crate issues put, update, remove and get operations against a
//! document store's `/document/v1` HTTP API and accounts for every call in
//! aggregate statistics. It defines *what* is sent and how outcomes are
//! counted; the [`Transport`] trait is the seam where infrastructure crates
//! supply *how* bytes reach the server.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Time is read through the [`Clock`] port so latency accounting can be made
//! deterministic in tests.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | [`DocumentId`] parsing and resource paths |
//! | [`types`] | [`Document`], wire request/response types, [`SendResult`] |
//! | [`config`] | [`ClientOptions`] |
//! | [`request`] | [`RequestBuilder`]: method, URL, query and body per operation |
//! | [`stats`] | [`StatsAggregator`] and [`Stats`] snapshots |
//! | [`clock`] | [`Clock`] port, [`SystemClock`], [`ManualClock`] |
//! | [`ports`] | [`Transport`] port |
//! | [`client`] | [`Client`] facade |
//! | [`result`] | [`OperationResult`] for front ends |
//! | [`feed`] | JSON feed decoding |
//! | [`errors`] | Error and retry-advice types |

pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod feed;
pub mod identifiers;
pub mod ports;
pub mod request;
pub mod result;
pub mod stats;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::Client;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientOptions, QueryParams, DEFAULT_BASE_URL};
pub use errors::{BuildError, DecodeError, FeedError, ParseError, RetryPolicy, TransportError};
pub use identifiers::{DocumentId, Selector, DOCUMENT_API_PREFIX};
pub use ports::Transport;
pub use request::RequestBuilder;
pub use result::OperationResult;
pub use stats::{CallHandle, InFlightCall, Outcome, Stats, StatsAggregator};
pub use types::{Document, FeedRequest, HttpResponse, Method, Operation, SendResult};
