use std::{collections::BTreeMap, fmt::Debug, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    macros::aggregate,
    metric::{Metric, RequestMetric},
};

/// Collects [`Metric`]s into a compact, mergeable intermediate form.
///
/// Aggregates keep raw counters and totals only. Derived values such as averages and
/// ratios are computed by a [`Report`](crate::Report) built from the aggregate.
///
/// Every virtual user owns its aggregate, and the driver merges them once the run is
/// over, so `merge` must be associative and commutative.
pub trait Aggregate
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Aggregate multiple metrics into the current instance.
    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);

    /// Combine two different aggregates into one.
    fn merge(&mut self, other: Self);
}

/// Counters for every request sharing one name.
#[aggregate]
#[derive(Default)]
pub struct RequestStats {
    pub count: usize,
    pub failures: usize,
    /// Requests whose transport failed outright
    pub errors: usize,
    pub retries: usize,
    pub total_latency: Duration,
    pub total_bytes: usize,
}

impl RequestStats {
    fn merge(&mut self, other: &RequestStats) {
        self.count += other.count;
        self.failures += other.failures;
        self.errors += other.errors;
        self.retries += other.retries;
        self.total_latency += other.total_latency;
        self.total_bytes += other.total_bytes;
    }
}

/// Per-request-name pass/fail accounting.
#[aggregate]
#[derive(Default)]
pub struct RequestAggregate {
    pub requests: BTreeMap<String, RequestStats>,
}

impl RequestAggregate {
    pub fn get(&self, name: &str) -> Option<&RequestStats> {
        self.requests.get(name)
    }

    /// Totals across every request name.
    pub fn total(&self) -> RequestStats {
        let mut total = RequestStats::default();
        for stats in self.requests.values() {
            total.merge(stats);
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl Aggregate for RequestAggregate {
    type Metric = RequestMetric;

    fn new() -> Self {
        RequestAggregate::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        let stats = self.requests.entry(metric.name.clone()).or_default();
        stats.count += 1;
        stats.failures += if metric.success { 0 } else { 1 };
        stats.errors += if metric.status.is_none() { 1 } else { 0 };
        stats.retries += metric.attempts.saturating_sub(1) as usize;
        stats.total_latency += metric.latency;
        stats.total_bytes += metric.bytes;
    }

    fn merge(&mut self, other: Self) {
        for (name, stats) in other.requests {
            self.requests.entry(name).or_default().merge(&stats);
        }
    }
}
