//! Aggregate call statistics.
//!
//! Every call made through the client is recorded twice: once when it is
//! issued and once when it completes. All counters live behind one mutex and
//! each event is applied under a single lock acquisition, so a [`Stats`]
//! snapshot always corresponds to some serial order of issue/complete events.
//!
//! Invariants of every snapshot:
//!
//! - `responses_received + errors <= requests_issued`
//! - `in_flight == requests_issued - responses_received - errors`
//! - `responses_by_status` sums to `responses_received`

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use crate::clock::Clock;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Point-in-time view of the call counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Calls issued.
    pub requests_issued: u64,
    /// Calls that produced an HTTP response, whatever its status.
    pub responses_received: u64,
    /// Responses per HTTP status code.
    pub responses_by_status: BTreeMap<u16, u64>,
    /// Calls that failed without producing a response.
    pub errors: u64,
    /// Calls issued but not yet completed.
    pub in_flight: u64,
    /// Sum of response latencies.
    #[serde(serialize_with = "serialize_millis")]
    pub total_latency: Duration,
    /// Smallest response latency. `None` until a response has been received.
    #[serde(serialize_with = "serialize_opt_millis")]
    pub min_latency: Option<Duration>,
    /// Largest response latency. `None` until a response has been received.
    #[serde(serialize_with = "serialize_opt_millis")]
    pub max_latency: Option<Duration>,
    /// Request body bytes sent.
    pub bytes_sent: u64,
    /// Response body bytes received.
    pub bytes_received: u64,
}

impl Stats {
    /// Mean response latency. `None` until a response has been received.
    pub fn average_latency(&self) -> Option<Duration> {
        let count = u32::try_from(self.responses_received).ok().filter(|n| *n > 0)?;
        Some(self.total_latency / count)
    }

    /// Number of 2xx responses.
    pub fn successes(&self) -> u64 {
        self.responses_by_status
            .iter()
            .filter(|(status, _)| (200..300).contains(*status))
            .map(|(_, count)| count)
            .sum()
    }

    /// Number of calls that did not succeed: non-2xx responses plus errors.
    pub fn failures(&self) -> u64 {
        self.responses_received.saturating_sub(self.successes()) + self.errors
    }

    /// Adds the counters of `other` to these, e.g. to total several clients.
    pub fn merge(&mut self, other: &Stats) {
        self.requests_issued += other.requests_issued;
        self.responses_received += other.responses_received;
        for (status, count) in &other.responses_by_status {
            *self.responses_by_status.entry(*status).or_default() += count;
        }
        self.errors += other.errors;
        self.in_flight += other.in_flight;
        self.total_latency += other.total_latency;
        self.min_latency = match (self.min_latency, other.min_latency) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_latency = match (self.max_latency, other.max_latency) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.bytes_sent += other.bytes_sent;
        self.bytes_received += other.bytes_received;
    }

    fn record_response(&mut self, status: u16, bytes_received: u64, elapsed: Duration) {
        self.responses_received += 1;
        *self.responses_by_status.entry(status).or_default() += 1;
        self.bytes_received += bytes_received;
        self.total_latency += elapsed;
        self.min_latency = Some(self.min_latency.map_or(elapsed, |min| min.min(elapsed)));
        self.max_latency = Some(self.max_latency.map_or(elapsed, |max| max.max(elapsed)));
    }
}

fn millis(value: &Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(millis(value))
}

fn serialize_opt_millis<S: Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_some(&millis(value)),
        None => serializer.serialize_none(),
    }
}

// ---------------------------------------------------------------------------
// Call lifecycle
// ---------------------------------------------------------------------------

/// How a call completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An HTTP response was received (any status).
    Success {
        status: u16,
        bytes_received: u64,
    },
    /// No response was received.
    Failure,
}

/// Ticket for an issued call, redeemed by [`StatsAggregator::on_complete`].
#[derive(Debug)]
#[must_use = "an issued call stays in flight until its handle is completed"]
pub struct CallHandle {
    start: Instant,
    bytes_sent: u64,
}

impl CallHandle {
    /// Returns the instant the call was issued.
    pub fn start(&self) -> Instant {
        self.start
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Thread-safe recorder of call statistics.
pub struct StatsAggregator {
    clock: Arc<dyn Clock>,
    stats: Mutex<Stats>,
}

impl StatsAggregator {
    /// Creates an empty aggregator reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            stats: Mutex::new(Stats::default()),
        }
    }

    /// Records that a call carrying `bytes_sent` body bytes has been issued.
    pub fn on_issue(&self, bytes_sent: u64) -> CallHandle {
        let start = self.clock.now();
        let mut stats = self.lock();
        stats.requests_issued += 1;
        stats.in_flight += 1;
        CallHandle { start, bytes_sent }
    }

    /// Records the completion of an issued call and returns its latency.
    ///
    /// Latency and received bytes are accounted only for calls that produced
    /// a response; failures count as errors.
    pub fn on_complete(&self, handle: CallHandle, outcome: Outcome) -> Duration {
        let elapsed = self.clock.now().saturating_duration_since(handle.start);
        let mut stats = self.lock();
        stats.in_flight = stats.in_flight.saturating_sub(1);
        stats.bytes_sent += handle.bytes_sent;
        match outcome {
            Outcome::Success {
                status,
                bytes_received,
            } => stats.record_response(status, bytes_received, elapsed),
            Outcome::Failure => stats.errors += 1,
        }
        elapsed
    }

    /// Issues a call tracked by a guard that records a failure if dropped
    /// before [`InFlightCall::complete`] is called.
    pub fn track(&self, bytes_sent: u64) -> InFlightCall<'_> {
        InFlightCall {
            aggregator: self,
            handle: Some(self.on_issue(bytes_sent)),
        }
    }

    /// Returns a consistent copy of the current counters.
    pub fn snapshot(&self) -> Stats {
        self.lock().clone()
    }

    // Counters are plain data and every update leaves them consistent, so a
    // panic elsewhere while holding the lock does not invalidate them.
    fn lock(&self) -> MutexGuard<'_, Stats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for StatsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsAggregator")
            .field("stats", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// An issued call that has not completed yet.
///
/// Dropping it without completing (e.g. when the future driving the call is
/// cancelled) records [`Outcome::Failure`], so no call stays in flight forever.
#[derive(Debug)]
pub struct InFlightCall<'a> {
    aggregator: &'a StatsAggregator,
    handle: Option<CallHandle>,
}

impl InFlightCall<'_> {
    /// Records the outcome of the call and returns its latency.
    pub fn complete(mut self, outcome: Outcome) -> Duration {
        match self.handle.take() {
            Some(handle) => self.aggregator.on_complete(handle, outcome),
            None => Duration::ZERO,
        }
    }
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("call abandoned before completion; recording failure");
            self.aggregator.on_complete(handle, Outcome::Failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::thread;

    fn aggregator(tick: Duration) -> StatsAggregator {
        StatsAggregator::new(Arc::new(ManualClock::new(tick)))
    }

    fn assert_consistent(stats: &Stats) {
        assert!(stats.responses_received + stats.errors <= stats.requests_issued);
        assert_eq!(
            stats.in_flight,
            stats.requests_issued - stats.responses_received - stats.errors
        );
        assert_eq!(
            stats.responses_by_status.values().sum::<u64>(),
            stats.responses_received
        );
    }

    #[test]
    fn new_aggregator_is_empty() {
        let stats = aggregator(Duration::from_secs(1)).snapshot();
        assert_eq!(stats, Stats::default());
        assert_eq!(stats.average_latency(), None);
        assert_eq!(stats.min_latency, None);
    }

    #[test]
    fn issue_then_complete_updates_counters() {
        let agg = aggregator(Duration::from_secs(1));

        let handle = agg.on_issue(25);
        let during = agg.snapshot();
        assert_eq!(during.requests_issued, 1);
        assert_eq!(during.in_flight, 1);
        assert_eq!(during.bytes_sent, 0);

        let latency = agg.on_complete(
            handle,
            Outcome::Success {
                status: 200,
                bytes_received: 23,
            },
        );
        assert_eq!(latency, Duration::from_secs(1));

        let after = agg.snapshot();
        assert_eq!(after.in_flight, 0);
        assert_eq!(after.responses_received, 1);
        assert_eq!(after.responses_by_status.get(&200), Some(&1));
        assert_eq!(after.bytes_sent, 25);
        assert_eq!(after.bytes_received, 23);
        assert_eq!(after.min_latency, Some(Duration::from_secs(1)));
        assert_eq!(after.max_latency, Some(Duration::from_secs(1)));
        assert_consistent(&after);
    }

    #[test]
    fn failures_count_errors_and_bytes_sent_only() {
        let agg = aggregator(Duration::from_secs(1));
        let handle = agg.on_issue(10);
        agg.on_complete(handle, Outcome::Failure);

        let stats = agg.snapshot();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.responses_received, 0);
        assert_eq!(stats.bytes_sent, 10);
        assert_eq!(stats.bytes_received, 0);
        assert_eq!(stats.total_latency, Duration::ZERO);
        assert_eq!(stats.min_latency, None);
        assert_consistent(&stats);
    }

    #[test]
    fn latency_bounds_bracket_the_average() {
        let start = Instant::now();
        let clock = Arc::new(ManualClock::starting_at(start, Duration::ZERO));
        let agg = StatsAggregator::new(clock.clone());

        for millis in [10, 30, 20] {
            let handle = agg.on_issue(0);
            clock.advance(Duration::from_millis(millis));
            agg.on_complete(
                handle,
                Outcome::Success {
                    status: 200,
                    bytes_received: 0,
                },
            );
        }

        let stats = agg.snapshot();
        assert_eq!(stats.total_latency, Duration::from_millis(60));
        assert_eq!(stats.min_latency, Some(Duration::from_millis(10)));
        assert_eq!(stats.max_latency, Some(Duration::from_millis(30)));
        let avg = stats.average_latency().unwrap();
        assert!(stats.min_latency.unwrap() <= avg && avg <= stats.max_latency.unwrap());
    }

    #[test]
    fn dropped_guard_records_failure() {
        let agg = aggregator(Duration::from_secs(1));
        {
            let _call = agg.track(5);
            assert_eq!(agg.snapshot().in_flight, 1);
        }
        let stats = agg.snapshot();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.bytes_sent, 5);

        let call = agg.track(0);
        call.complete(Outcome::Success {
            status: 204,
            bytes_received: 0,
        });
        let stats = agg.snapshot();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.responses_received, 1);
    }

    #[test]
    fn concurrent_updates_stay_consistent() {
        let agg = Arc::new(aggregator(Duration::from_millis(1)));
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    for i in 0..500u64 {
                        let handle = agg.on_issue(3);
                        assert_consistent(&agg.snapshot());
                        let outcome = if (t + i) % 5 == 0 {
                            Outcome::Failure
                        } else {
                            Outcome::Success {
                                status: if i % 2 == 0 { 200 } else { 502 },
                                bytes_received: 7,
                            }
                        };
                        agg.on_complete(handle, outcome);
                    }
                })
            })
            .collect();

        // Snapshots taken while writers run must already be consistent.
        for _ in 0..200 {
            assert_consistent(&agg.snapshot());
        }
        for handle in threads {
            handle.join().unwrap();
        }

        let stats = agg.snapshot();
        assert_consistent(&stats);
        assert_eq!(stats.requests_issued, 4000);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.responses_received + stats.errors, 4000);
        assert_eq!(stats.bytes_sent, 12_000);
        assert_eq!(stats.bytes_received, stats.responses_received * 7);
    }

    #[test]
    fn merge_adds_counters_and_widens_bounds() {
        let mut a = Stats {
            requests_issued: 2,
            responses_received: 2,
            responses_by_status: BTreeMap::from([(200, 2)]),
            total_latency: Duration::from_secs(4),
            min_latency: Some(Duration::from_secs(1)),
            max_latency: Some(Duration::from_secs(3)),
            bytes_sent: 10,
            ..Stats::default()
        };
        let b = Stats {
            requests_issued: 3,
            responses_received: 1,
            responses_by_status: BTreeMap::from([(200, 1)]),
            errors: 1,
            in_flight: 1,
            total_latency: Duration::from_secs(5),
            min_latency: Some(Duration::from_secs(5)),
            max_latency: Some(Duration::from_secs(5)),
            bytes_received: 8,
            ..Stats::default()
        };

        a.merge(&b);

        assert_eq!(a.requests_issued, 5);
        assert_eq!(a.responses_by_status.get(&200), Some(&3));
        assert_eq!(a.min_latency, Some(Duration::from_secs(1)));
        assert_eq!(a.max_latency, Some(Duration::from_secs(5)));
        assert_eq!(a.in_flight, 1);
        assert_consistent(&a);
    }

    #[test]
    fn successes_and_failures() {
        let stats = Stats {
            requests_issued: 4,
            responses_received: 3,
            responses_by_status: BTreeMap::from([(200, 2), (502, 1)]),
            errors: 1,
            ..Stats::default()
        };
        assert_eq!(stats.successes(), 2);
        assert_eq!(stats.failures(), 2);
    }

    #[test]
    fn failures_saturate_on_inconsistent_counters() {
        let stats = Stats {
            responses_received: 1,
            responses_by_status: BTreeMap::from([(200, 3)]),
            errors: 2,
            ..Stats::default()
        };
        assert_eq!(stats.failures(), 2);
    }

    #[test]
    fn serializes_latencies_as_millis() {
        let stats = Stats {
            total_latency: Duration::from_millis(1500),
            min_latency: Some(Duration::from_millis(250)),
            ..Stats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_latency"], 1500);
        assert_eq!(json["min_latency"], 250);
        assert!(json["max_latency"].is_null());
    }
}
