//! Executor — drives the virtual-user population of a `Scenario`
//!
//! The `Executor` trait is the runtime hook that runs a scenario. The core only
//! promises the [`Scheduler::tick`](crate::shape::Scheduler::tick) contract; an
//! executor is whatever calls it and enforces the answer. [`ShapeExecutor`] is the
//! provided one, other strategies (fixed population, distributed...) can implement
//! the same trait.
//!
//! # High-level flow of `ShapeExecutor`
//! 1. A control loop samples `scheduler.tick(elapsed)` every `tick`.
//! 2. While the live population is below the target it spawns virtual users, while it
//!    is above it stops the most recently spawned ones. Either way it moves at most
//!    `spawn_rate` users per second.
//! 3. Each virtual user is a Tokio task owning its own `Session`. It runs the
//!    scenario's `action`, waits a random `wait_time`, and repeats until stopped.
//! 4. Once `tick` returns `None` every remaining user is stopped, and the user-local
//!    aggregates are merged into the final result.
//!
//! # Spawn budget
//! The rate is continuous while the loop is discrete, so the number of users that may
//! be started (or stopped) during one tick is carried with a fractional accumulator:
//!
//! ```text
//! add_f = |spawn_rate| * tick_seconds
//! add_total = floor(add_f + fractional)
//! fractional = (add_f + fractional) - add_total
//! ```
//!
//! A phase with a spawn rate of zero (a flat ramp) applies its target immediately.
//! The accumulator is cleared whenever the population already matches the target.
//!
//! # Stopping
//! Stopping a user is cooperative: its stop signal is raised, the current iteration
//! of `action` runs to completion, and any retry loop inside it gives up instead of
//! backing off again. Per-request timeouts still apply independently.
//!
//! # Common pitfalls & recommendations
//! - **Do not perform blocking I/O inside the `action`.** Every user is an async
//!   task; blocking one stalls the others sharing the worker thread.
//! - **Share one transport.** The default `ReqwestTransport` pools connections;
//!   building a client per user or per request defeats that.
//! - **Pick `tick` for the shape.** Phases shorter than one tick (spikes in particular)
//!   may be sampled once or not at all.
pub mod shape;
pub use shape::{ShapeExecutor, WaitTime};

use crate::{aggregate::RequestAggregate, error::Result, scenario::Scenario, session::Session};

pub trait Executor<F, Fut>
where
    Self: Send + Sync + Sized,
    F: Fn(Session) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Execute the scenario and return the merged aggregate of every virtual user.
    fn exec(
        &self,
        scenario: &Scenario<Self, F, Fut>,
    ) -> impl Future<Output = Result<RequestAggregate>> + Send;
}
