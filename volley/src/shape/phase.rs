use std::time::Duration;

/// A contiguous slice of the load profile.
///
/// Over `[start, start + duration]` the target user count moves linearly from
/// `user_start` to `user_end`. Phases are produced by the
/// [`ProfileBuilder`](super::ProfileBuilder) and never change afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Phase {
    pub start: Duration,
    pub duration: Duration,
    pub user_start: usize,
    pub user_end: usize,
    /// Users per second
    pub spawn_rate: f64,
}

impl Phase {
    pub fn new(
        start: Duration,
        duration: Duration,
        user_start: usize,
        user_end: usize,
        spawn_rate: f64,
    ) -> Self {
        Self {
            start,
            duration,
            user_start,
            user_end,
            spawn_rate,
        }
    }

    pub fn end(&self) -> Duration {
        self.start + self.duration
    }

    /// Whether `t` lies inside the closed interval covered by this phase.
    pub fn contains(&self, t: Duration) -> bool {
        t >= self.start && t <= self.end()
    }

    /// Target user count at elapsed time `t`, or `None` if the phase is not active.
    ///
    /// The interpolated value is truncated toward zero, so a ramp from 10 to 20 over
    /// 10s yields 14 at 4.9s.
    pub fn user_count_at(&self, t: Duration) -> Option<usize> {
        if !self.contains(t) {
            return None;
        }
        // instant step
        if self.duration.is_zero() {
            return Some(self.user_end);
        }

        let progress = (t - self.start).as_secs_f64() / self.duration.as_secs_f64();
        let from = self.user_start as f64;
        let to = self.user_end as f64;
        Some((from + (to - from) * progress) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[rstest]
    #[case(0.0, Some(10))]
    #[case(2.5, Some(12))]
    #[case(4.9, Some(14))]
    #[case(5.0, Some(15))]
    #[case(10.0, Some(20))]
    fn interpolates_and_truncates(#[case] t: f64, #[case] expected: Option<usize>) {
        let phase = Phase::new(Duration::ZERO, secs(10.0), 10, 20, 1.0);
        assert_eq!(phase.user_count_at(secs(t)), expected);
    }

    #[rstest]
    #[case(0.0, Some(20))]
    #[case(2.5, Some(16))]
    #[case(5.0, Some(12))]
    #[case(10.0, Some(5))]
    fn ramps_down(#[case] t: f64, #[case] expected: Option<usize>) {
        let phase = Phase::new(Duration::ZERO, secs(10.0), 20, 5, -1.5);
        assert_eq!(phase.user_count_at(secs(t)), expected);
    }

    #[test]
    fn boundaries_are_exact() {
        let phase = Phase::new(secs(3.7), secs(11.3), 4, 97, 1.0);
        assert_eq!(phase.user_count_at(phase.start), Some(4));
        assert_eq!(phase.user_count_at(phase.end()), Some(97));
    }

    #[test]
    fn outside_interval_is_none() {
        let phase = Phase::new(secs(5.0), secs(5.0), 0, 10, 2.0);
        assert_eq!(phase.user_count_at(secs(4.999)), None);
        assert_eq!(phase.user_count_at(secs(10.001)), None);
        assert_eq!(phase.user_count_at(Duration::ZERO), None);
    }

    #[test]
    fn zero_duration_is_an_instant_step() {
        let phase = Phase::new(secs(2.0), Duration::ZERO, 3, 8, 8.0);
        assert_eq!(phase.user_count_at(secs(2.0)), Some(8));
        assert_eq!(phase.user_count_at(secs(2.000_001)), None);
        assert_eq!(phase.user_count_at(secs(1.999_999)), None);
    }
}
