//! Retry with exponential backoff around a single logical request
//!
//! Every attempt ends in one of three ways:
//!
//! - **success**: the status matches the expected one, the response is returned;
//! - **retryable failure**: the status is one of the policy's retryable statuses, or
//!   the transport itself failed;
//! - **terminal failure**: any other status, returned as-is without retrying.
//!
//! After a retryable failure the loop waits `base_delay * backoff_factor^(n - 1)`
//! (`n` being the 1-indexed attempt that just failed) and tries again, until
//! `max_attempts` is reached. An exhausted status failure hands back the last response;
//! an exhausted transport failure propagates the error.
//!
//! The wait is a `tokio::time::sleep` in the caller's own task, so one virtual user
//! backing off never holds up another. It is raced against the run's [`StopSignal`],
//! and the signal is checked again before each new attempt.
use std::{collections::BTreeSet, time::Duration};

use crate::{
    error::{Error, Result, TransportError},
    stop::StopSignal,
    transport::{PreparedRequest, Response, Transport},
};

pub const DEFAULT_RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_factor: f64,
    retryable_statuses: BTreeSet<u16>,
}

impl RetryPolicy {
    /// Fails if `max_attempts` is zero or `backoff_factor` is below 1.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Result<Self> {
        if max_attempts < 1 {
            return Err(Error::invalid_retry_policy(
                "max_attempts must be at least 1",
            ));
        }
        if !backoff_factor.is_finite() || backoff_factor < 1.0 {
            return Err(Error::invalid_retry_policy(format!(
                "backoff_factor must be a finite number >= 1, got {backoff_factor}"
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            backoff_factor,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
        })
    }

    /// Replace the default `500, 502, 503, 504` set.
    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    pub fn retryable_statuses(&self) -> &BTreeSet<u16> {
        &self.retryable_statuses
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Wait after the 1-indexed `attempt` failed. Saturates instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Retryable,
    Terminal,
}

/// Classify a received status. Without a policy nothing is retryable.
pub fn classify(status: u16, expected: u16, policy: Option<&RetryPolicy>) -> Outcome {
    if status == expected {
        Outcome::Success
    } else if policy.is_some_and(|p| p.is_retryable(status)) {
        Outcome::Retryable
    } else {
        Outcome::Terminal
    }
}

/// The response the retry loop settled on and how many attempts it took.
#[derive(Clone, Debug)]
pub struct Attempted {
    pub response: Response,
    pub attempts: u32,
}

/// The transport error left once retrying stopped.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{error} (after {attempts} attempts)")]
pub struct Failed {
    #[source]
    pub error: TransportError,
    pub attempts: u32,
}

/// Run `request` through `transport`, retrying according to `policy`.
///
/// Without a policy exactly one attempt is made and its result returned as-is. A
/// transport error that outlives the policy comes back as [`Failed`].
pub async fn execute_with_retry(
    transport: &dyn Transport,
    request: &PreparedRequest,
    expected_status: u16,
    policy: Option<&RetryPolicy>,
    stop: &StopSignal,
) -> std::result::Result<Attempted, Failed> {
    let mut attempt = 1;
    loop {
        let result = transport.execute(request).await;
        if let Ok(res) = &result {
            if classify(res.status, expected_status, policy) != Outcome::Retryable {
                return settle(result, attempt);
            }
        }

        let policy = match policy {
            Some(p) if attempt < p.max_attempts && !stop.is_stopped() => p,
            _ => return settle(result, attempt),
        };
        let delay = policy.delay_for(attempt);
        match &result {
            Ok(res) => tracing::warn!(
                url = %request.url,
                attempt,
                status = res.status,
                ?delay,
                "Retryable status, backing off"
            ),
            Err(err) => tracing::warn!(
                url = %request.url,
                attempt,
                error = %err,
                ?delay,
                "Transport error, backing off"
            ),
        }

        if !back_off(delay, stop).await {
            tracing::info!(url = %request.url, attempt, "Run stopped, abandoning retries");
            return settle(result, attempt);
        }
        attempt += 1;
    }
}

/// Wait `delay` unless `stop` is raised first. Returns `false` once stopped, including
/// when the stop lands together with the end of the wait.
async fn back_off(delay: Duration, stop: &StopSignal) -> bool {
    let mut signal = stop.clone();
    tokio::select! {
        biased;
        _ = signal.stopped() => false,
        _ = tokio::time::sleep(delay) => !stop.is_stopped(),
    }
}

fn settle(
    result: std::result::Result<Response, TransportError>,
    attempts: u32,
) -> std::result::Result<Attempted, Failed> {
    result
        .map(|response| Attempted { response, attempts })
        .map_err(|error| Failed { error, attempts })
}
