//! Test doubles shared by the unit tests.
use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use reqwest::{Url, header::HeaderMap};
use tokio::time::Instant;

use crate::{
    error::TransportError,
    transport::{Body, Method, PreparedRequest, Response, Transport},
};

type Scripted = Result<Response, TransportError>;

/// Replays a fixed list of outcomes and remembers every request it saw.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<Scripted>,
    calls: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    /// Panics once the script runs dry.
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: Mutex::default(),
            requests: Mutex::default(),
        }
    }

    pub fn always(outcome: Scripted) -> Self {
        Self {
            fallback: Some(outcome),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<Response, TransportError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .expect("scripted transport ran out of responses")
    }
}

pub fn get() -> PreparedRequest {
    PreparedRequest {
        method: Method::Get,
        url: Url::parse("http://localhost/health").unwrap(),
        headers: HeaderMap::new(),
        body: Body::Empty,
        timeout: None,
    }
}
