use std::{marker::PhantomData, sync::Arc};

use typed_builder::TypedBuilder;

use crate::{
    aggregate::RequestAggregate,
    error::Result,
    executor::Executor,
    session::{HttpConfig, Session},
    transport::{ReqwestTransport, Transport},
};

/// Glue between what a virtual user does and how the population is driven.
///
/// `action` is one iteration of a virtual user's task. It receives the user's own
/// [`Session`] and is called again, after the executor's wait time, until the user is
/// stopped.
#[derive(TypedBuilder)]
pub struct Scenario<E, F, Fut>
where
    E: Executor<F, Fut> + Send + Sync,
    F: Fn(Session) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    #[builder(setter(into))]
    pub name: String,
    pub action: F,
    pub executor: E,
    #[builder(setter(transform = |config: HttpConfig| Arc::new(config)))]
    pub http: Arc<HttpConfig>,
    #[builder(default = Arc::new(ReqwestTransport::default()))]
    pub transport: Arc<dyn Transport>,
    #[builder(default, setter(skip))]
    future: PhantomData<fn() -> Fut>,
}

impl<E, F, Fut> Scenario<E, F, Fut>
where
    E: Executor<F, Fut> + Send + Sync,
    F: Fn(Session) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub async fn run(&self) -> Result<RequestAggregate> {
        self.executor.exec(self).await
    }

    /// Fresh session for virtual user `user_id`.
    pub fn session(&self, user_id: usize) -> Session {
        Session::new(self.transport.clone(), self.http.clone()).with_user_id(user_id)
    }
}
