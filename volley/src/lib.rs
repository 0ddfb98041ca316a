//! Volley — load shapes and an HTTP request pipeline for load tests.
//!
//! Volley answers two questions during a load-test run:
//!
//! - *how many virtual users should be alive right now, and how fast should we get
//!   there?* — answered by a [`Scheduler`] sampling a load [`Profile`];
//! - *what does one virtual user actually do?* — a chain of HTTP requests built with a
//!   [`RequestBuilder`], sent through a retry loop with exponential backoff and checked
//!   with a [`ResponseValidator`].
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`shape`]: [`Phase`](shape::Phase)s, the [`ProfileBuilder`] chaining them, and the
//!   [`Scheduler`] whose `tick(elapsed)` is the contract any driver follows.
//! - [`Session`]: everything one virtual user needs (transport, HTTP defaults, stop
//!   signal, its own pass/fail accounting). `session.http(name)` starts a request.
//! - [`retry`]: the bounded, cancellable backoff loop around one logical request.
//! - [`ResponseValidator`]: chainable, declarative checks reduced to a boolean.
//! - [`Transport`]: the seam to the HTTP client, [`ReqwestTransport`] by default.
//! - [`Metric`], [`Aggregate`], [`Report`], [`Reporter`]: pass/fail accounting of the
//!   requests sent, merged across users once the run is over.
//! - [`Scenario`] and [`Executor`]: glue that runs a user action under a load shape.
//!   [`ShapeExecutor`] is the provided driver, but any engine honouring
//!   `Scheduler::tick` can be used instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use serde_json::json;
//! use volley::{
//!     HttpConfig, Reporter, RetryPolicy, Scenario, Session, ShapeExecutor,
//!     report::{StdoutReporter, SummaryReport},
//!     shape::ProfileBuilder,
//!     transport::Method,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let profile = ProfileBuilder::new()
//!         .spike(10)
//!         .ramp_up(20, Duration::from_secs(10))?
//!         .steady_users(5, Duration::from_secs(5))
//!         .stress_ramp(5, 15, Duration::from_secs(10))?
//!         .build();
//!
//!     let results = Scenario::builder()
//!         .name("Users API")
//!         .http(HttpConfig::builder().base_uri("http://localhost:8000").build())
//!         .action(|session: Session| async move {
//!             let created = session
//!                 .http("Create User")
//!                 .method(Method::Post)
//!                 .path("/users")
//!                 .json(json!({"name": "John Doe"}))
//!                 .expect_status(201)
//!                 .retry(RetryPolicy::new(3, Duration::from_secs(1), 2.0).unwrap())
//!                 .send()
//!                 .await;
//!             if let Ok(reply) = created {
//!                 reply.validator().status_is(201).json_contains("id").validate();
//!             }
//!         })
//!         .executor(ShapeExecutor::builder().scheduler(profile).build())
//!         .build()
//!         .run()
//!         .await?;
//!
//!     StdoutReporter.report(SummaryReport::from(results)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Feature flags
//! - `internals`: expose the executor's building blocks (spawn budget, virtual-user
//!   task). Unstable.

extern crate self as volley;

/// Metric aggregators
pub mod aggregate;
pub mod error;
/// Orchestrators that define how things will actually run
pub mod executor;
/// Single metrics
pub mod metric;
/// Reports and Reporters
pub mod report;
pub mod request;
pub mod retry;
/// Main module of the framework that glues everything together
pub mod scenario;
pub mod session;
pub mod shape;
pub mod stop;
pub mod transport;
pub mod validate;

#[cfg(test)]
mod testing;

pub use aggregate::{Aggregate, RequestAggregate};
pub use error::{Error, Result, TransportError};
pub use executor::{Executor, ShapeExecutor, WaitTime};
pub use metric::{Metric, RequestMetric};
pub use report::{Report, Reporter};
pub use request::{Reply, RequestBuilder};
pub use retry::RetryPolicy;
pub use scenario::Scenario;
pub use session::{HttpConfig, Session};
pub use shape::{Profile, ProfileBuilder, Scheduler};
pub use stop::{StopHandle, StopSignal};
pub use transport::{ReqwestTransport, Transport};
pub use validate::ResponseValidator;

/// Procedural macros to reduce boilerplate
pub mod macros {
    pub use volley_macros::*;
}
