use std::{collections::BTreeMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use typed_builder::TypedBuilder;

use crate::{
    aggregate::{Aggregate, RequestAggregate},
    metric::RequestMetric,
    request::RequestBuilder,
    stop::StopSignal,
    transport::Transport,
};

/// Settings shared by every request a virtual user sends.
///
/// Passed explicitly into each [`Session`], there is no process-wide default.
#[derive(Clone, Debug, TypedBuilder)]
pub struct HttpConfig {
    /// Prefix joined with every request path
    #[builder(setter(into))]
    pub base_uri: String,
    /// Sent with every request, a request header of the same name wins
    #[builder(default)]
    pub default_headers: BTreeMap<String, String>,
    #[builder(default = true)]
    pub log_requests: bool,
    #[builder(default = true)]
    pub log_responses: bool,
    /// Used when a request does not set its own timeout
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
}

/// Everything one virtual user needs to issue requests.
///
/// Cloning is cheap and clones share the same user-local aggregate; sessions of
/// different users never share one.
#[derive(Clone)]
pub struct Session {
    user_id: usize,
    transport: Arc<dyn Transport>,
    config: Arc<HttpConfig>,
    stop: StopSignal,
    aggregate: Arc<Mutex<RequestAggregate>>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<HttpConfig>) -> Self {
        Self {
            user_id: 0,
            transport,
            config,
            stop: StopSignal::never(),
            aggregate: Arc::new(Mutex::new(RequestAggregate::new())),
        }
    }

    pub fn with_user_id(mut self, user_id: usize) -> Self {
        self.user_id = user_id;
        self
    }

    /// Observe `stop` from every retry loop started by this session.
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Start a request. `name` groups it in the pass/fail accounting.
    pub fn http(&self, name: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), name.into())
    }

    pub fn user_id(&self) -> usize {
        self.user_id
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub(crate) async fn record(&self, metric: &RequestMetric) {
        self.aggregate.lock().await.consume(metric);
    }

    /// Copy of what this user has recorded so far.
    pub async fn aggregate(&self) -> RequestAggregate {
        self.aggregate.lock().await.clone()
    }

    /// Drain the recorded metrics, leaving an empty aggregate behind.
    pub async fn take_aggregate(&self) -> RequestAggregate {
        std::mem::take(&mut *self.aggregate.lock().await)
    }
}
