//! Request builder — one logical HTTP interaction of a virtual user
//!
//! A [`RequestBuilder`] is obtained from [`Session::http`], configured through chained
//! setters and consumed by [`send`](RequestBuilder::send):
//!
//! ```rust,no_run
//! # use std::time::Duration;
//! # use serde_json::json;
//! # use volley::{RetryPolicy, Session, transport::Method};
//! # async fn flow(session: Session) -> volley::Result<()> {
//! let profile = session
//!     .http("Get User Profile")
//!     .method(Method::Get)
//!     .path("/users/profile")
//!     .header("Authorization", "Bearer token")
//!     .retry(RetryPolicy::new(3, Duration::from_secs(1), 2.0)?)
//!     .send()
//!     .await?;
//!
//! if !profile.validator().status_is(200).json_contains("id").validate() {
//!     tracing::error!("Failed to get user profile");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Sending
//! 1. The URL is `base_uri` joined with the path, plus the encoded query parameters.
//! 2. Only one body goes out: file attachments make it multipart (form fields ride
//!    along as text parts), otherwise the JSON body, otherwise the form body.
//! 3. The request runs through the retry loop of [`crate::retry`].
//! 4. The body is decoded into a JSON object. Anything else comes back as
//!    `{"raw_response": <text>}`.
//!
//! An unexpected status is not an error: it is logged, recorded as a failed request
//! in the session's aggregate and the reply is returned all the same. Only
//! configuration problems and transport failures that survive the retry policy
//! surface as [`Error`]s.
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::{
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::{
    error::{Error, Result},
    metric::RequestMetric,
    retry::{self, Attempted, Failed, RetryPolicy},
    session::Session,
    transport::{self, Attachment, Body, Method, PreparedRequest, Response},
    validate::ResponseValidator,
};

/// Key holding the response text when the body is not a JSON object.
pub const RAW_RESPONSE_KEY: &str = "raw_response";

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingFile {
    field: String,
    path: PathBuf,
    content_type: String,
}

/// Fluent, single-use description of a request. See the [module docs](self).
#[must_use = "a request does nothing until `send` is awaited"]
pub struct RequestBuilder {
    session: Session,
    name: String,
    method: Method,
    path: String,
    headers: BTreeMap<String, String>,
    json: Option<Value>,
    form: Vec<(String, String)>,
    files: Vec<PendingFile>,
    query: BTreeMap<String, String>,
    expected_status: u16,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    log_request: bool,
    log_response: bool,
}

impl RequestBuilder {
    pub(crate) fn new(session: Session, name: String) -> Self {
        let config = session.config();
        let (log_request, log_response, timeout) =
            (config.log_requests, config.log_responses, config.timeout);
        Self {
            session,
            name,
            method: Method::Get,
            path: String::new(),
            headers: BTreeMap::new(),
            json: None,
            form: Vec::new(),
            files: Vec::new(),
            query: BTreeMap::new(),
            expected_status: 200,
            timeout,
            retry: None,
            log_request,
            log_response,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set a header. Names are case-insensitive and the last write wins.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn headers<K, V>(self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |builder, (name, value)| builder.header(name, value))
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Append urlencoded form fields (or multipart text fields when files are attached).
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach the file at `path`. It is read when the request is sent.
    pub fn file(
        mut self,
        field: impl Into<String>,
        path: impl AsRef<Path>,
        content_type: impl Into<String>,
    ) -> Self {
        self.files.push(PendingFile {
            field: field.into(),
            path: path.as_ref().to_path_buf(),
            content_type: content_type.into(),
        });
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(name.into(), value.to_string());
        self
    }

    pub fn queries<K, V>(self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        params
            .into_iter()
            .fold(self, |builder, (name, value)| builder.query(name, value))
    }

    /// Status counted as a success, 200 unless set.
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn log_request(mut self, enabled: bool) -> Self {
        self.log_request = enabled;
        self
    }

    pub fn log_response(mut self, enabled: bool) -> Self {
        self.log_response = enabled;
        self
    }

    pub fn disable_request_logging(self) -> Self {
        self.log_request(false)
    }

    pub fn disable_response_logging(self) -> Self {
        self.log_response(false)
    }

    /// Resolve everything that can be resolved before touching the network.
    pub async fn prepare(&self) -> Result<PreparedRequest> {
        let config = self.session.config();
        let url = resolve_url(&config.base_uri, &self.path, &self.query)?;

        let mut headers = HeaderMap::new();
        let merged = config
            .default_headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .filter(|(name, _)| !self.headers.contains_key(name))
            .chain(self.headers.iter().map(|(name, value)| (name.clone(), value)));
        for (name, value) in merged {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::invalid_header(&name, err))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|err| Error::invalid_header(&name, err))?;
            headers.insert(header_name, header_value);
        }

        Ok(PreparedRequest {
            method: self.method,
            url,
            headers,
            body: self.body().await?,
            timeout: self.timeout,
        })
    }

    /// Send the request and decode the reply.
    ///
    /// A status other than the expected one is recorded as a failure and still
    /// returned. Errors are configuration problems, unreadable attachments, and
    /// transport failures left after retrying.
    pub async fn send(self) -> Result<Reply> {
        let request = self.prepare().await?;
        let user = self.session.user_id();
        if self.log_request {
            tracing::info!(
                user,
                request = %self.name,
                method = %request.method,
                url = %request.url,
                headers = ?request.headers,
                body = ?request.body,
                "Sending request"
            );
        }

        let started = Instant::now();
        let result = retry::execute_with_retry(
            self.session.transport(),
            &request,
            self.expected_status,
            self.retry.as_ref(),
            self.session.stop_signal(),
        )
        .await;
        let latency = started.elapsed();

        let Attempted { response, attempts } = match result {
            Ok(attempted) => attempted,
            Err(Failed { error, attempts }) => {
                tracing::error!(
                    user,
                    request = %self.name,
                    url = %request.url,
                    attempts,
                    %error,
                    "Request failed"
                );
                self.session
                    .record(&self.metric(None, latency, false, 0, attempts))
                    .await;
                return Err(error.into());
            }
        };

        let success = response.status == self.expected_status;
        if !success {
            tracing::error!(
                user,
                request = %self.name,
                "Request failed: expected status {}, got {} - {}",
                self.expected_status,
                response.status,
                response.body
            );
        }
        if self.log_response {
            tracing::info!(
                user,
                request = %self.name,
                status = response.status,
                attempts,
                ?latency,
                body = %response.body,
                "Received response"
            );
        }
        self.session
            .record(&self.metric(
                Some(response.status),
                latency,
                success,
                response.body.len(),
                attempts,
            ))
            .await;

        let data = decode(&response.body).unwrap_or_else(|| {
            tracing::warn!(
                user,
                request = %self.name,
                "Response is not a JSON object: {}",
                response.body
            );
            raw_response(&response.body)
        });
        Ok(Reply {
            response,
            data,
            attempts,
            success,
        })
    }

    async fn body(&self) -> Result<Body> {
        if !self.files.is_empty() {
            let mut files = Vec::with_capacity(self.files.len());
            for file in &self.files {
                files.push(read_attachment(file).await?);
            }
            return Ok(Body::Multipart {
                fields: self.form.clone(),
                files,
            });
        }
        Ok(match (&self.json, self.form.is_empty()) {
            (Some(json), _) => Body::Json(json.clone()),
            (None, false) => Body::Form(self.form.clone()),
            (None, true) => Body::Empty,
        })
    }

    fn metric(
        &self,
        status: Option<u16>,
        latency: Duration,
        success: bool,
        bytes: usize,
        attempts: u32,
    ) -> RequestMetric {
        RequestMetric {
            name: self.name.clone(),
            method: self.method,
            status,
            latency,
            success,
            bytes,
            attempts,
        }
    }
}

/// What [`RequestBuilder::send`] hands back.
#[derive(Clone, Debug)]
pub struct Reply {
    pub response: Response,
    /// Decoded JSON object, or `{"raw_response": <text>}`
    pub data: Map<String, Value>,
    pub attempts: u32,
    /// Whether the status matched the expected one
    pub success: bool,
}

impl Reply {
    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn validator(&self) -> ResponseValidator<'_> {
        ResponseValidator::new(&self.response)
    }
}

fn resolve_url(base: &str, path: &str, query: &BTreeMap<String, String>) -> Result<Url> {
    let joined = if path.is_empty() {
        base.to_string()
    } else if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };
    let mut url = Url::parse(&joined).map_err(|err| Error::invalid_url(&joined, err))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

fn decode(body: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn raw_response(body: &str) -> Map<String, Value> {
    Map::from_iter([(
        RAW_RESPONSE_KEY.to_string(),
        Value::String(body.to_string()),
    )])
}

async fn read_attachment(file: &PendingFile) -> Result<Attachment> {
    transport::check_content_type(&file.content_type).map_err(|err| {
        Error::InvalidAttachment {
            path: file.path.clone(),
            message: format!("content type `{}`: {err}", file.content_type),
        }
    })?;
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| Error::Attachment {
            path: file.path.clone(),
            source,
        })?;
    let file_name = file
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.field.clone());
    Ok(Attachment {
        field: file.field.clone(),
        file_name,
        content_type: file.content_type.clone(),
        bytes,
    })
}
