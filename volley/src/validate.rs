use std::cell::OnceCell;

use serde_json::Value;

use crate::transport::Response;

/// Declarative checks over a [`Response`], reduced to one boolean by [`validate`].
///
/// Every check appends a named outcome and hands the validator back, so checks chain:
///
/// ```rust
/// # use volley::{transport::Response, validate::ResponseValidator};
/// # use serde_json::json;
/// let res = Response::new(200, r#"{"id": 1, "status": "active"}"#);
/// let ok = ResponseValidator::new(&res)
///     .status_is(200)
///     .json_matches(&json!({"status": "active"}))
///     .json_contains("id")
///     .validate();
/// assert!(ok);
/// ```
///
/// A failed check never raises. The body is parsed at most once, on the first JSON
/// check.
///
/// Note that [`validate`] on a validator without any check is `true`: an empty chain
/// passes vacuously, so always add at least one check.
///
/// [`validate`]: ResponseValidator::validate
#[derive(Debug)]
pub struct ResponseValidator<'a> {
    response: &'a Response,
    body: OnceCell<Option<Value>>,
    results: Vec<(String, bool)>,
}

impl<'a> ResponseValidator<'a> {
    pub fn new(response: &'a Response) -> Self {
        Self {
            response,
            body: OnceCell::new(),
            results: Vec::new(),
        }
    }

    pub fn status_is(&mut self, code: u16) -> &mut Self {
        let passed = self.response.status == code;
        self.record(format!("status_is({code})"), passed)
    }

    /// Header presence, the name is matched case-insensitively.
    pub fn has_header(&mut self, name: &str) -> &mut Self {
        let passed = self.response.headers.contains_key(name);
        self.record(format!("has_header({name})"), passed)
    }

    /// The body is a JSON object with a top-level `key`. A body that does not parse
    /// simply fails the check.
    pub fn json_contains(&mut self, key: &str) -> &mut Self {
        let passed = self
            .object()
            .is_some_and(|object| object.contains_key(key));
        self.record(format!("json_contains({key})"), passed)
    }

    /// Every top-level key of `partial` exists in the body with an equal value.
    ///
    /// Keys missing from `partial` are ignored, so this is a subset match rather than
    /// equality. Evaluation stops at the first mismatching key.
    pub fn json_matches(&mut self, partial: &Value) -> &mut Self {
        let passed = match (self.object(), partial.as_object()) {
            (Some(body), Some(partial)) => partial
                .iter()
                .all(|(key, expected)| body.get(key) == Some(expected)),
            _ => false,
        };
        self.record("json_matches".to_string(), passed)
    }

    /// Conjunction of all recorded checks, `true` when there are none.
    pub fn validate(&self) -> bool {
        self.results.iter().all(|(_, passed)| *passed)
    }

    pub fn results(&self) -> &[(String, bool)] {
        &self.results
    }

    pub fn failures(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|(_, passed)| !passed)
            .map(|(name, _)| name.as_str())
    }

    fn object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.body
            .get_or_init(|| self.response.json())
            .as_ref()
            .and_then(Value::as_object)
    }

    fn record(&mut self, name: String, passed: bool) -> &mut Self {
        self.results.push((name, passed));
        self
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::json;

    use super::*;

    fn active() -> Response {
        Response::new(200, r#"{"id": 1, "status": "active"}"#)
    }

    #[test]
    fn subset_match_and_key_presence() {
        let res = active();
        assert!(
            ResponseValidator::new(&res)
                .json_matches(&json!({"status": "active"}))
                .json_contains("id")
                .validate()
        );
        assert!(
            !ResponseValidator::new(&res)
                .json_matches(&json!({"status": "inactive"}))
                .validate()
        );
    }

    #[test]
    fn empty_chain_passes_vacuously() {
        let res = Response::new(500, "boom");
        let validator = ResponseValidator::new(&res);
        assert!(validator.validate());
        assert!(validator.results().is_empty());
    }

    #[test]
    fn mismatch_is_local_to_its_check() {
        let res = active();
        let mut validator = ResponseValidator::new(&res);
        validator
            .json_matches(&json!({"status": "inactive", "id": 1}))
            .json_contains("id")
            .status_is(200);

        assert!(!validator.validate());
        assert_eq!(validator.results().len(), 3);
        assert_eq!(validator.failures().collect::<Vec<_>>(), vec!["json_matches"]);
    }

    #[test]
    fn json_checks_fail_softly_on_non_json() {
        let res = Response::new(200, "<html>nope</html>");
        let mut validator = ResponseValidator::new(&res);
        validator
            .json_contains("id")
            .json_matches(&json!({"id": 1}));
        assert_eq!(validator.failures().count(), 2);
    }

    #[test]
    fn json_matches_compares_nested_values_exactly() {
        let res = Response::new(200, r#"{"user": {"role": "admin", "id": 7}, "ok": true}"#);
        assert!(
            ResponseValidator::new(&res)
                .json_matches(&json!({"user": {"role": "admin", "id": 7}}))
                .validate()
        );
        assert!(
            !ResponseValidator::new(&res)
                .json_matches(&json!({"user": {"role": "admin"}}))
                .validate()
        );
        assert!(
            !ResponseValidator::new(&res)
                .json_matches(&json!(["ok"]))
                .validate()
        );
    }

    #[test]
    fn status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let res = Response::new(201, "{}").with_headers(headers);

        let mut validator = ResponseValidator::new(&res);
        validator.status_is(201).has_header("Content-Type");
        assert!(validator.validate());

        validator.has_header("X-Request-Id").status_is(200);
        assert!(!validator.validate());
        assert_eq!(
            validator.failures().collect::<Vec<_>>(),
            vec!["has_header(X-Request-Id)", "status_is(200)"]
        );
    }
}
