use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::BTreeMap, fmt::Debug, time::Duration};

use crate::aggregate::{Aggregate, RequestAggregate, RequestStats};

/// Final, human- or machine-friendly view derived from an [`Aggregate`].
pub trait Report<A>
where
    Self: Send + Sync + Debug + From<A> + Serialize + DeserializeOwned,
    A: Aggregate,
{
}

/// Sends a [`Report`] somewhere (stdout, a file, a dashboard...).
#[async_trait]
pub trait Reporter<A: Aggregate, R: Report<A>> {
    async fn report(&self, report: R) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RequestSummary {
    pub count: usize,
    pub failures: usize,
    pub errors: usize,
    pub retries: usize,
    /// Percentage of failed requests
    pub failure_ratio: f64,
    pub average_latency: Duration,
    pub total_bytes: usize,
}

impl From<&RequestStats> for RequestSummary {
    fn from(stats: &RequestStats) -> Self {
        // an empty bucket reports zeros instead of NaN
        let (failure_ratio, average_latency) = match stats.count {
            0 => (0.0, Duration::ZERO),
            n => (
                (stats.failures as f64 / n as f64) * 100.0,
                stats.total_latency.div_f64(n as f64),
            ),
        };
        Self {
            count: stats.count,
            failures: stats.failures,
            errors: stats.errors,
            retries: stats.retries,
            failure_ratio,
            average_latency,
            total_bytes: stats.total_bytes,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SummaryReport {
    pub requests: BTreeMap<String, RequestSummary>,
    pub total: RequestSummary,
}

impl From<RequestAggregate> for SummaryReport {
    fn from(value: RequestAggregate) -> Self {
        Self {
            total: RequestSummary::from(&value.total()),
            requests: value
                .requests
                .iter()
                .map(|(name, stats)| (name.clone(), RequestSummary::from(stats)))
                .collect(),
        }
    }
}

impl Report<RequestAggregate> for SummaryReport {}

pub struct StdoutReporter;

#[async_trait]
impl Reporter<RequestAggregate, SummaryReport> for StdoutReporter {
    async fn report(
        &self,
        report: SummaryReport,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
