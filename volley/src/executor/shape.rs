use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use tokio::{task::JoinHandle, time::Instant};
use typed_builder::TypedBuilder;

use super::Executor;
use crate::{
    aggregate::{Aggregate, RequestAggregate},
    error::{Error, Result},
    scenario::Scenario,
    session::Session,
    shape::Scheduler,
    stop::{self, StopHandle, StopSignal},
};
use internals::*;

/// Pause a virtual user takes between two iterations of its action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    /// Uniformly random pause in `[min, max]`.
    pub fn between(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidWaitTime { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn constant(wait: Duration) -> Self {
        Self {
            min: wait,
            max: wait,
        }
    }

    pub fn none() -> Self {
        Self::constant(Duration::ZERO)
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }
}

impl Default for WaitTime {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(3),
        }
    }
}

/// Executor that follows a load shape: it samples the [`Scheduler`] every `tick` and
/// grows or shrinks the virtual-user population toward the target.
///
/// ```rust,no_run
/// # use std::time::Duration;
/// # use volley::{executor::{ShapeExecutor, WaitTime}, shape::ProfileBuilder};
/// # fn main() -> volley::Result<()> {
/// let executor = ShapeExecutor::builder()
///     .scheduler(
///         ProfileBuilder::new()
///             .ramp_up(50, Duration::from_secs(30))?
///             .steady_users(50, Duration::from_secs(60))
///             .build(),
///     )
///     .wait_time(WaitTime::between(Duration::from_secs(2), Duration::from_secs(5))?)
///     .build();
/// # Ok(())
/// # }
/// ```
#[derive(TypedBuilder)]
pub struct ShapeExecutor {
    #[builder(setter(into))]
    pub scheduler: Scheduler,
    /// Sampling period of the scheduler. Must be greater than zero, `exec` fails with
    /// [`Error::InvalidTick`] otherwise.
    #[builder(default = Duration::from_secs(1))]
    pub tick: Duration,
    #[builder(default)]
    pub wait_time: WaitTime,
}

impl<F, Fut> Executor<F, Fut> for ShapeExecutor
where
    F: Fn(Session) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn exec(&self, scenario: &Scenario<Self, F, Fut>) -> Result<RequestAggregate> {
        if self.tick.is_zero() {
            return Err(Error::InvalidTick(self.tick));
        }
        let started = Instant::now();
        let mut next_tick = started;
        let mut users: Vec<VirtualUser> = Vec::new();
        let mut stopped: Vec<JoinHandle<RequestAggregate>> = Vec::new();
        let mut fractional = 0.0;
        let mut next_id = 0;

        tracing::info!(scenario = %scenario.name, total = ?self.scheduler.total_duration(), "Running load shape");
        while let Some(target) = self.scheduler.tick(started.elapsed()) {
            let live = users.len();
            if live == target.users {
                fractional = 0.0;
            } else {
                let (budget, f) = calc_spawn_budget(target.spawn_rate, self.tick, fractional);
                fractional = f;
                if target.users > live {
                    let n = budget.min(target.users - live);
                    for _ in 0..n {
                        users.push(spawn_user(scenario, next_id, self.wait_time));
                        next_id += 1;
                    }
                } else {
                    let n = budget.min(live - target.users);
                    for user in users.drain(live - n..) {
                        user.stop.stop();
                        stopped.push(user.handle);
                    }
                }
                tracing::debug!(users = target.users, live = users.len(), "Adjusted population");
            }

            next_tick += self.tick;
            tokio::time::sleep_until(next_tick).await;
        }

        tracing::info!(live = users.len(), "Load shape exhausted, stopping virtual users");
        for user in users.drain(..) {
            user.stop.stop();
            stopped.push(user.handle);
        }

        tracing::info!("Processing results...");
        let mut final_agg = RequestAggregate::new();
        for agg in join_all(stopped).await {
            final_agg.merge(agg?);
        }

        tracing::info!("Done running scenario: {}!", scenario.name);
        Ok(final_agg)
    }
}

#[cfg(feature = "internals")]
pub use internals::*;

mod internals {
    use super::*;

    pub struct VirtualUser {
        pub stop: StopHandle,
        pub handle: JoinHandle<RequestAggregate>,
    }

    /// Pure function computing how many users may be started or stopped this tick,
    /// returning the count and the carried fractional part.
    ///
    /// A zero rate means "no limit".
    pub fn calc_spawn_budget(spawn_rate: f64, tick: Duration, fractional: f64) -> (usize, f64) {
        let rate = spawn_rate.abs();
        if rate == 0.0 || !rate.is_finite() {
            return (usize::MAX, 0.0);
        }
        // users to move this tick as float
        let add_f = rate * tick.as_secs_f64();
        // convert to an integer count (carry the fractional part)
        let add_total = (add_f + fractional).floor();
        let fractional = (add_f + fractional) - add_total;
        (add_total as usize, fractional)
    }

    pub fn spawn_user<E, F, Fut>(
        scenario: &Scenario<E, F, Fut>,
        user_id: usize,
        wait_time: WaitTime,
    ) -> VirtualUser
    where
        E: Executor<F, Fut> + Send + Sync,
        F: Fn(Session) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, signal) = stop::channel();
        let session = scenario.session(user_id).with_stop(signal.clone());
        let handle = tokio::spawn(user_task(
            session,
            scenario.action.clone(),
            wait_time,
            signal,
        ));
        VirtualUser { stop, handle }
    }

    /// One virtual user: run the action, wait, repeat until stopped.
    pub async fn user_task<F, Fut>(
        session: Session,
        action: F,
        wait_time: WaitTime,
        mut stop: StopSignal,
    ) -> RequestAggregate
    where
        F: Fn(Session) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let user = session.user_id();
        tracing::debug!(user, "Virtual user started");
        while !session.is_stopped() {
            action(session.clone()).await;
            tokio::select! {
                _ = tokio::time::sleep(wait_time.sample()) => {}
                _ = stop.stopped() => break,
            }
        }
        tracing::debug!(user, "Virtual user stopped");
        session.take_aggregate().await
    }
}
