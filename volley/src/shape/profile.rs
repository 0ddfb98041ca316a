use std::{sync::Arc, time::Duration};

use super::Phase;
use crate::error::{Error, Result};

/// How long a spike holds its user count before the next phase takes over.
///
/// Must be non-zero so the spike is visible to a scheduler scanning by elapsed time.
pub const SPIKE_HOLD: Duration = Duration::from_millis(100);

/// The finished, read-only load profile: phases in construction order.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    phases: Arc<[Phase]>,
}

impl Profile {
    pub fn builder() -> ProfileBuilder {
        ProfileBuilder::new()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// End of the last phase, `Duration::ZERO` for an empty profile.
    pub fn total_duration(&self) -> Duration {
        self.phases.last().map(Phase::end).unwrap_or_default()
    }
}

/// Chains phases back to back, keeping a cursor on the end of the last one.
///
/// The builder is single-use: [`build`](Self::build) consumes it. Directives that can
/// reject their input return `Result<Self>`, so a chain reads
///
/// ```rust
/// # use std::time::Duration;
/// # use volley::shape::ProfileBuilder;
/// # fn main() -> volley::Result<()> {
/// let profile = ProfileBuilder::new()
///     .spike(10)
///     .ramp_up(20, Duration::from_secs(10))?
///     .steady_users(5, Duration::from_secs(5))
///     .stress_ramp(5, 15, Duration::from_secs(10))?
///     .build();
/// assert_eq!(profile.len(), 4);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ProfileBuilder {
    phases: Vec<Phase>,
    cursor: Duration,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump straight to `users` and hold them for [`SPIKE_HOLD`].
    pub fn spike(self, users: usize) -> Self {
        self.push(SPIKE_HOLD, users, users, users as f64)
    }

    /// Ramp linearly from wherever the previous phase ended (0 if none) to `to_users`.
    pub fn ramp_up(self, to_users: usize, duration: Duration) -> Result<Self> {
        let from_users = self.phases.last().map(|p| p.user_end).unwrap_or(0);
        self.ramp("ramp_up", from_users, to_users, duration)
    }

    /// Hold `users` for `duration`. A zero duration is allowed and yields an instant.
    pub fn steady_users(self, users: usize, duration: Duration) -> Self {
        self.push(duration, users, users, 1.0)
    }

    /// Ramp from an explicit `from_users` instead of the previous phase's end.
    pub fn stress_ramp(self, from_users: usize, to_users: usize, duration: Duration) -> Result<Self> {
        self.ramp("stress_ramp", from_users, to_users, duration)
    }

    pub fn build(self) -> Profile {
        Profile {
            phases: self.phases.into(),
        }
    }

    fn ramp(self, directive: &str, from: usize, to: usize, duration: Duration) -> Result<Self> {
        if duration.is_zero() {
            return Err(Error::invalid_phase(format!(
                "{directive} requires a duration greater than zero"
            )));
        }
        let spawn_rate = (to as f64 - from as f64) / duration.as_secs_f64();
        Ok(self.push(duration, from, to, spawn_rate))
    }

    fn push(mut self, duration: Duration, user_start: usize, user_end: usize, spawn_rate: f64) -> Self {
        self.phases.push(Phase::new(
            self.cursor,
            duration,
            user_start,
            user_end,
            spawn_rate,
        ));
        self.cursor += duration;
        self
    }
}
