use std::{fmt::Debug, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use crate::{macros::metric, transport::Method};

/// A single sample produced by a virtual user.
/// Metrics can be composed of other metrics as well
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
}

/// One logical request as seen by the pass/fail accounting.
///
/// `status` is `None` when the transport failed before a response arrived. `latency`
/// spans every retry attempt of the request.
#[metric]
pub struct RequestMetric {
    pub name: String,
    pub method: Method,
    pub status: Option<u16>,
    pub latency: Duration,
    pub success: bool,
    pub bytes: usize,
    pub attempts: u32,
}
