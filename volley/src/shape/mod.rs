//! Load shapes — how many virtual users should be alive at any point of a run
//!
//! A load shape is a piecewise-linear function of elapsed run time. It is assembled
//! from [`Phase`]s by a [`ProfileBuilder`] and sampled by a [`Scheduler`] once per
//! driver tick.
//!
//! # Phases
//! Every phase covers the closed interval `[start, start + duration]` and interpolates
//! the target user count linearly between `user_start` and `user_end`:
//!
//! ```text
//! progress = (t - start) / duration
//! users(t) = trunc(user_start + (user_end - user_start) * progress)
//! ```
//!
//! The result is truncated toward zero, never rounded. A phase with a zero duration is
//! an instant step straight to `user_end`.
//!
//! # Building a profile
//! The builder keeps a cursor at the end of the last phase, so every directive starts
//! where the previous one stopped and the phases stay contiguous:
//!
//! - `spike(users)`: hold `users` for [`SPIKE_HOLD`], spawning all of them at once.
//! - `ramp_up(to, d)`: ramp from the previous phase's end (or 0) to `to` over `d`.
//! - `steady_users(users, d)`: hold `users` for `d`.
//! - `stress_ramp(from, to, d)`: ramp from an explicit `from` to `to` over `d`.
//!
//! Ramps need a non-zero duration and fail with [`Error::InvalidPhase`] otherwise.
//!
//! # Ticking
//! [`Scheduler::tick`] returns the first phase (in construction order) covering the
//! elapsed time, paired with its spawn rate. Past the end of the last phase it returns
//! `None`, which is the driver's cue to stop the run.
//!
//! [`Error::InvalidPhase`]: crate::Error::InvalidPhase
pub mod phase;
pub mod profile;
pub mod scheduler;

pub use phase::Phase;
pub use profile::{Profile, ProfileBuilder, SPIKE_HOLD};
pub use scheduler::{Scheduler, Target};
