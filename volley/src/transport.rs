//! Transport — the seam between the request pipeline and an actual HTTP client
//!
//! The pipeline never talks to sockets itself. It assembles a [`PreparedRequest`] and
//! hands it to a [`Transport`], which either produces a [`Response`] or fails with a
//! [`TransportError`] (connection refused, timeout elapsed, ...). A non-2xx status is a
//! perfectly valid `Response`; deciding whether it is a failure is the caller's job.
//!
//! [`ReqwestTransport`] is the provided implementation. Tests and custom clients can
//! plug in their own.
use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{
    Client, Url,
    header::HeaderMap,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// A file already loaded into memory, ready to go out as a multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The single body representation that goes on the wire.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `multipart/form-data`, text fields first and then the files
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<Attachment>,
    },
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// A fully resolved request. It is immutable so every retry attempt sends the same thing.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug, Default)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Header lookup, names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body parsed as JSON, `None` if it is not valid JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` once. No retries happen at this level.
    async fn execute(&self, request: &PreparedRequest) -> Result<Response, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
///
/// Build it once and share it between virtual users, the client pools connections
/// internally and is cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Form(fields) => builder.form(fields),
            Body::Multipart { fields, files } => builder.multipart(multipart_form(fields, files)?),
        };

        let res = builder.send().await?;
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.text().await?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

/// Parse `content_type` the way the multipart encoder will.
pub(crate) fn check_content_type(content_type: &str) -> Result<(), reqwest::Error> {
    Part::bytes(Vec::new()).mime_str(content_type).map(drop)
}

// reqwest forms are single-use, so one is rebuilt for every attempt
fn multipart_form(
    fields: &[(String, String)],
    files: &[Attachment],
) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name.clone(), value.clone());
    }
    for file in files {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        form = form.part(file.field.clone(), part);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{CONTENT_TYPE, HeaderValue};

    #[test]
    fn method_names() {
        assert_eq!(Method::Options.to_string(), "OPTIONS");
        assert_eq!(reqwest::Method::from(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(Method::default(), Method::Get);
    }

    #[test]
    fn response_header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let res = Response::new(200, "{}").with_headers(headers);
        assert_eq!(res.header("Content-Type"), Some("application/json"));
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.header("x-missing"), None);
    }

    #[test]
    fn content_types_are_checked() {
        assert!(check_content_type("image/jpeg").is_ok());
        assert!(check_content_type("application/json; charset=utf-8").is_ok());
        assert!(check_content_type("not a mime").is_err());
        assert!(check_content_type("").is_err());
    }

    #[test]
    fn only_empty_body_is_empty() {
        assert!(Body::default().is_empty());
        assert!(!Body::Form(Vec::new()).is_empty());
        assert!(!Body::Json(Value::Null).is_empty());
    }

    #[test]
    fn json_is_optional() {
        assert!(Response::new(200, "not json").json().is_none());
        assert_eq!(
            Response::new(200, r#"{"a":1}"#).json(),
            Some(serde_json::json!({"a": 1}))
        );
    }
}
