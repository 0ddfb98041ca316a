use std::time::Duration;

use super::{Phase, Profile};

/// What the driver should aim for right now.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub users: usize,
    /// Users per second
    pub spawn_rate: f64,
}

/// Tick controller over a built [`Profile`].
///
/// `tick` is a pure read of immutable phase data, so a `Scheduler` can be cloned into
/// a control task and sampled while requests are in flight.
#[derive(Clone, Debug)]
pub struct Scheduler {
    profile: Profile,
}

impl Scheduler {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    /// Target for `elapsed` run time, or `None` once the profile is exhausted.
    ///
    /// Phases are scanned in construction order and the first one covering `elapsed`
    /// wins, which also decides the shared boundary between two contiguous phases.
    pub fn tick(&self, elapsed: Duration) -> Option<Target> {
        self.profile.phases().iter().find_map(|phase| {
            phase.user_count_at(elapsed).map(|users| Target {
                users,
                spawn_rate: phase.spawn_rate,
            })
        })
    }

    pub fn phases(&self) -> &[Phase] {
        self.profile.phases()
    }

    pub fn total_duration(&self) -> Duration {
        self.profile.total_duration()
    }
}

impl From<Profile> for Scheduler {
    fn from(profile: Profile) -> Self {
        Self::new(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{ProfileBuilder, SPIKE_HOLD};

    fn reference() -> Scheduler {
        ProfileBuilder::new()
            .spike(10)
            .ramp_up(20, Duration::from_secs(10))
            .unwrap()
            .steady_users(5, Duration::from_secs(5))
            .stress_ramp(5, 15, Duration::from_secs(10))
            .unwrap()
            .build()
            .into()
    }

    #[test]
    fn starts_with_the_spike() {
        let target = reference().tick(Duration::ZERO).unwrap();
        assert_eq!(target.users, 10);
        assert_eq!(target.spawn_rate, 10.0);
    }

    #[test]
    fn mid_ramp_is_strictly_between_endpoints() {
        let target = reference().tick(Duration::from_secs(5)).unwrap();
        assert!(target.users > 10 && target.users < 20, "{target:?}");
        assert_eq!(target.spawn_rate, 1.0);
    }

    #[test]
    fn shared_boundary_goes_to_earlier_phase() {
        let scheduler = reference();
        let ramp_end = SPIKE_HOLD + Duration::from_secs(10);
        // the ramp ends on 20 and the steady phase starts on 5
        assert_eq!(scheduler.tick(ramp_end).unwrap().users, 20);
        assert_eq!(
            scheduler.tick(ramp_end + Duration::from_millis(1)).unwrap().users,
            5
        );
    }

    #[test]
    fn stress_phase_is_reached() {
        let scheduler = reference();
        let end = scheduler.total_duration();
        assert_eq!(scheduler.tick(end).unwrap().users, 15);
        assert_eq!(
            scheduler.tick(end - Duration::from_secs(5)).unwrap().users,
            10
        );
    }

    #[test]
    fn exhausted_profile_returns_none() {
        let scheduler = reference();
        let end = scheduler.total_duration();
        assert!(scheduler.tick(end + Duration::from_nanos(1)).is_none());
        assert!(scheduler.tick(end + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn empty_profile_never_ticks() {
        let scheduler = Scheduler::new(ProfileBuilder::new().build());
        assert!(scheduler.tick(Duration::ZERO).is_none());
    }
}
