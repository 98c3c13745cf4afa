//! Request assertions.
//!
//! A [`RequestMatcher`] checks that a [`Request`] has the expected shape. The
//! [`RequestMatcherBuilder`] accumulates assertions and runs them all, so a
//! single [`Mismatch`] lists every difference at once.

use std::fmt;

use derive_more::Error;
use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tongs_core::{FormValues, Request, parse_post_form};

/// Checks a request against expectations.
pub trait RequestMatcher: Send + Sync {
    /// Check `request`.
    ///
    /// The request is mutable so the body can be buffered while inspected, it
    /// stays readable afterwards.
    ///
    /// # Errors
    ///
    /// Returns a [`Mismatch`] describing every failed expectation.
    fn match_request(&self, request: &mut Request) -> Result<(), Mismatch>;
}

impl<M: RequestMatcher + ?Sized> RequestMatcher for Box<M> {
    fn match_request(&self, request: &mut Request) -> Result<(), Mismatch> {
        (**self).match_request(request)
    }
}

impl<M: RequestMatcher + ?Sized> RequestMatcher for std::sync::Arc<M> {
    fn match_request(&self, request: &mut Request) -> Result<(), Mismatch> {
        (**self).match_request(request)
    }
}

/// Every reason a request did not match, one per line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct Mismatch {
    reasons: Vec<String>,
}

impl Mismatch {
    /// A mismatch with a single reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reasons: vec![reason.into()],
        }
    }

    /// The failed expectations.
    #[must_use]
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    fn join(reasons: Vec<String>) -> Result<(), Self> {
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(Self { reasons })
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reasons.join("\n"))
    }
}

type Assertion = Box<dyn Fn(&mut Request) -> Vec<String> + Send + Sync>;

/// Builds a [`RequestMatcher`] from a list of assertions.
///
/// # Example
///
/// ```
/// use tongs_core::RequestBuilder;
/// use tongs_test::{RequestMatcher, RequestMatcherBuilder};
///
/// let matcher = RequestMatcherBuilder::new()
///     .method("GET")
///     .url_host("api.example.com")
///     .url_path("/users");
///
/// let mut request = RequestBuilder::new("GET", "https://api.example.com/users")
///     .request()
///     .expect("request");
///
/// assert!(matcher.match_request(&mut request).is_ok());
/// ```
#[derive(Default)]
pub struct RequestMatcherBuilder {
    assertions: Vec<Assertion>,
}

impl fmt::Debug for RequestMatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestMatcherBuilder")
            .field("assertions", &self.assertions.len())
            .finish()
    }
}

impl RequestMatcherBuilder {
    /// A matcher accepting any request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn assert<F>(mut self, assertion: F) -> Self
    where
        F: Fn(&mut Request) -> Vec<String> + Send + Sync + 'static,
    {
        self.assertions.push(Box::new(assertion));
        self
    }

    /// Expect the request method.
    #[must_use]
    pub fn method(self, method: &str) -> Self {
        let method = method.to_string();
        self.assert(move |request| {
            let actual = request.method().as_str();
            if actual == method {
                vec![]
            } else {
                vec![format!("request method {actual:?} != {method:?}")]
            }
        })
    }

    /// Expect the URL host, port included when not the scheme's default.
    #[must_use]
    pub fn url_host(self, host: &str) -> Self {
        let host = host.to_string();
        self.assert(move |request| {
            let url = request.url();
            let actual = match (url.host_str(), url.port()) {
                (Some(name), Some(port)) => format!("{name}:{port}"),
                (Some(name), None) => name.to_string(),
                (None, _) => String::new(),
            };
            if actual == host {
                vec![]
            } else {
                vec![format!("request url host {actual:?} != {host:?}")]
            }
        })
    }

    /// Expect the URL path.
    #[must_use]
    pub fn url_path(self, path: &str) -> Self {
        let path = path.to_string();
        self.assert(move |request| {
            let actual = request.url().path();
            if actual == path {
                vec![]
            } else {
                vec![format!("request url path {actual:?} != {path:?}")]
            }
        })
    }

    /// Expect each key of `params` in the query string, with exactly the
    /// given values in order. Other keys are ignored.
    #[must_use]
    pub fn url_query_params_contains(self, params: FormValues) -> Self {
        self.assert(move |request| {
            let mut actual = FormValues::new();
            for (key, value) in request.url().query_pairs() {
                actual
                    .entry(key.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }

            contains("url query param", &params, |key| actual.get(key).cloned())
        })
    }

    /// Expect each header of `headers`, with exactly the given values in
    /// order. Other headers are ignored.
    #[must_use]
    pub fn headers_contains(self, headers: HeaderMap) -> Self {
        let expected = header_values(&headers);
        self.assert(move |request| {
            let actual = header_values(request.headers());
            contains("header", &expected, |key| actual.get(key).cloned())
        })
    }

    /// Expect the URL-encoded body to hold `expected`.
    ///
    /// When `strict`, keys that are not expected are reported too.
    #[must_use]
    pub fn body_form(self, expected: FormValues, strict: bool) -> Self {
        self.assert(move |request| {
            let form = match parse_post_form(request) {
                Ok(form) => form,
                Err(err) => return vec![format!("unable to parse post form: {err}")],
            };

            let mut reasons = Vec::new();
            for (key, values) in &expected {
                match form.get(key) {
                    None => reasons.push(format!(
                        "key {key:?} is expected to exist but is not found"
                    )),
                    Some(actual) if actual != values => {
                        reasons.push(format!("key {key:?} values differ {values:?} {actual:?}"));
                    }
                    Some(_) => {}
                }
            }

            if strict {
                for (key, values) in form {
                    if !expected.contains_key(key) {
                        reasons.push(format!("remaining key found in form: {key:?}: {values:?}"));
                    }
                }
            }

            reasons
        })
    }

    /// Expect the JSON body to decode to `expected`.
    ///
    /// When `strict`, object fields absent from `expected` once serialized
    /// are reported as unknown.
    #[must_use]
    pub fn body_json<T>(self, expected: T, strict: bool) -> Self
    where
        T: Serialize + DeserializeOwned + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        self.assert(move |request| {
            let bytes = match request.body_mut().buffer() {
                Ok(bytes) => bytes,
                Err(err) => return vec![format!("unable to read body: {err}")],
            };
            let body = match serde_json::from_slice::<Value>(bytes) {
                Ok(body) => body,
                Err(err) => return vec![format!("unable to parse json: {err}")],
            };

            if strict {
                let reference = match serde_json::to_value(&expected) {
                    Ok(reference) => reference,
                    Err(err) => return vec![format!("unable to serialize expected json: {err}")],
                };
                let mut unknown = Vec::new();
                unknown_fields(&body, &reference, "", &mut unknown);
                if !unknown.is_empty() {
                    return unknown
                        .into_iter()
                        .map(|field| format!("json: unknown field {field:?}"))
                        .collect();
                }
            }

            match serde_json::from_value::<T>(body) {
                Ok(actual) if actual == expected => vec![],
                Ok(actual) => vec![format!(
                    "json does not match: expected {expected:?}, got {actual:?}"
                )],
                Err(err) => vec![format!("unable to parse json: {err}")],
            }
        })
    }
}

impl RequestMatcher for RequestMatcherBuilder {
    fn match_request(&self, request: &mut Request) -> Result<(), Mismatch> {
        let reasons = self
            .assertions
            .iter()
            .flat_map(|assertion| assertion(request))
            .collect();
        Mismatch::join(reasons)
    }
}

fn header_values(headers: &HeaderMap) -> FormValues {
    let mut values = FormValues::new();
    for (name, value) in headers {
        values
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    values
}

fn contains<F>(what: &str, expected: &FormValues, actual: F) -> Vec<String>
where
    F: Fn(&str) -> Option<Vec<String>>,
{
    expected
        .iter()
        .filter_map(|(key, values)| match actual(key) {
            None => Some(format!("expected {what} key {key:?} to be set")),
            Some(found) if &found != values => Some(format!(
                "expected {what} key {key:?} to be {values:?} but is {found:?}"
            )),
            Some(_) => None,
        })
        .collect()
}

fn unknown_fields(actual: &Value, reference: &Value, prefix: &str, unknown: &mut Vec<String>) {
    match (actual, reference) {
        (Value::Object(actual), Value::Object(reference)) => {
            for (key, value) in actual {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match reference.get(key) {
                    Some(expected) => unknown_fields(value, expected, &path, unknown),
                    None => unknown.push(path),
                }
            }
        }
        (Value::Array(actual), Value::Array(reference)) => {
            for (index, (value, expected)) in actual.iter().zip(reference).enumerate() {
                unknown_fields(value, expected, &format!("{prefix}[{index}]"), unknown);
            }
        }
        _ => {}
    }
}
