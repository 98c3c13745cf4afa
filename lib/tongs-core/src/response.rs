//! HTTP response handling.
//!
//! [`ResponseBuilder`] wraps the outcome of an execution and dispatches the
//! response to the handler registered for its status code. Statuses without
//! handler are errors: the body is drained and reported in the error message.
//!
//! # Example
//!
//! ```
//! use tongs_core::{Response, ResponseBuilder};
//!
//! #[derive(serde::Deserialize, Default)]
//! struct User {
//!     user_id: u64,
//! }
//!
//! let response = Response::new(201, http::HeaderMap::new(), r#"{"user_id":42}"#);
//!
//! let mut user = User::default();
//! ResponseBuilder::new(Ok(response))
//!     .receive_json(201, &mut user)
//!     .success_on_status(204)
//!     .resolve()
//!     .expect("resolved");
//!
//! assert_eq!(user.user_id, 42);
//! ```
//!
//! A response builder can only be resolved once:
//!
//! ```compile_fail
//! use tongs_core::{Response, ResponseBuilder};
//!
//! let builder = ResponseBuilder::new(Ok(Response::new(204, http::HeaderMap::new(), "")));
//! let _first = builder.resolve();
//! let _second = builder.resolve();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;
use http::header::{CONTENT_LENGTH, HeaderName, HeaderValue};
use url::Url;

use crate::{Body, BodyDump, Error, LimitExceeded, ReadLimit, ResponseContext, Result};

// ============================================================================
// Response
// ============================================================================

/// HTTP response with status, headers, and a readable body.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Body,
    content_length: Option<u64>,
    method: http::Method,
    url: Option<Url>,
}

impl Response {
    /// Creates a new response.
    ///
    /// The declared content length is taken from the `Content-Length` header,
    /// or from the body itself when it is held in memory.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Body>) -> Self {
        let body = body.into();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .or_else(|| body.as_bytes().map(|bytes| bytes.len() as u64));

        Self {
            status,
            headers,
            body,
            content_length,
            method: http::Method::GET,
            url: None,
        }
    }

    /// Overrides the declared content length; `None` means unknown.
    #[must_use]
    pub const fn with_content_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub(crate) fn set_origin(&mut self, method: http::Method, url: Url) {
        self.method = method;
        self.url = Some(url);
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Declared body length, if known.
    #[must_use]
    pub const fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Mutable access to the body, for reading it.
    pub const fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Consume into the body.
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Method of the request that produced this response.
    #[must_use]
    pub const fn method(&self) -> &http::Method {
        &self.method
    }

    /// URL of the request that produced this response, once executed.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Method, URL and status, for error reporting.
    #[must_use]
    pub fn context(&self) -> ResponseContext {
        ResponseContext {
            method: self.method.to_string(),
            url: self.url.as_ref().map(crate::redacted_url).unwrap_or_default(),
            status: self.status,
        }
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Decode one JSON value from the body.
    ///
    /// Reading stops at the end of the value, trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonDecode`] with the path of the offending field.
    pub fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let context = self.context();
        let mut deserializer = serde_json::Deserializer::from_reader(&mut self.body);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
            let path = e.path().to_string();
            let source = e.into_inner();
            Error::JsonDecode {
                context,
                path,
                message: source.to_string(),
                source,
            }
        })
    }

    /// Read the whole remaining body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyRead`] if the body cannot be read.
    pub fn bytes(&mut self) -> Result<Bytes> {
        self.body.read_all().map_err(Into::into)
    }

    /// Read the whole remaining body as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyRead`] if the body cannot be read or is not UTF-8.
    pub fn text(&mut self) -> Result<String> {
        let mut text = String::new();
        self.body.read_to_string(&mut text)?;
        Ok(text)
    }
}

// ============================================================================
// Response Builder
// ============================================================================

type Handler<'a> = Box<dyn FnOnce(&mut Response) -> Result<()> + 'a>;

/// Status-based dispatch of an executed request.
///
/// Handlers may borrow data for `'a`, e.g. the destination of
/// [`receive_json`](Self::receive_json).
#[must_use = "a response builder does nothing until resolved"]
pub struct ResponseBuilder<'a> {
    outcome: Result<Response>,
    read_limit: ReadLimit,
    handlers: HashMap<u16, Handler<'a>>,
}

impl fmt::Debug for ResponseBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses = self.handlers.keys().copied().collect::<Vec<_>>();
        statuses.sort_unstable();

        f.debug_struct("ResponseBuilder")
            .field("outcome", &self.outcome)
            .field("read_limit", &self.read_limit)
            .field("handled_statuses", &statuses)
            .finish()
    }
}

impl<'a> ResponseBuilder<'a> {
    /// Wraps the outcome of an execution.
    ///
    /// The read limit defaults to [`ReadLimit::ContentLength`].
    pub fn new(outcome: Result<Response>) -> Self {
        Self {
            outcome,
            read_limit: ReadLimit::default(),
            handlers: HashMap::new(),
        }
    }

    /// Sets how many bytes of the body handlers may read.
    pub const fn read_limit(mut self, read_limit: ReadLimit) -> Self {
        self.read_limit = read_limit;
        self
    }

    /// Registers `handler` for `status`, replacing any previous one.
    pub fn on_status<F>(mut self, status: u16, handler: F) -> Self
    where
        F: FnOnce(&mut Response) -> Result<()> + 'a,
    {
        self.handlers.insert(status, Box::new(handler));
        self
    }

    /// Registers `handler` for each of `statuses`.
    pub fn on_statuses<I, F>(mut self, statuses: I, handler: F) -> Self
    where
        I: IntoIterator<Item = u16>,
        F: Fn(&mut Response) -> Result<()> + 'a,
    {
        let handler = Rc::new(handler);
        for status in statuses {
            let handler = Rc::clone(&handler);
            self.handlers
                .insert(status, Box::new(move |response| handler(response)));
        }
        self
    }

    /// Treats `status` as a success, ignoring the body.
    pub fn success_on_status(self, status: u16) -> Self {
        self.on_status(status, |_| Ok(()))
    }

    /// Treats each of `statuses` as a success, ignoring the body.
    pub fn success_on_statuses(self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.on_statuses(statuses, |_| Ok(()))
    }

    /// Fails with `error` when the response status is `status`.
    ///
    /// The error is returned as [`Error::Custom`]; use [`Error::is`] to
    /// recognize it.
    pub fn error_on_status<E>(self, status: u16, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let error: Arc<dyn std::error::Error + Send + Sync> = Arc::new(error);
        self.on_status(status, move |_| Err(Error::Custom(error)))
    }

    /// Decodes a JSON body into `destination` when the response status is
    /// `status`.
    pub fn receive_json<T>(self, status: u16, destination: &'a mut T) -> Self
    where
        T: serde::de::DeserializeOwned,
    {
        self.on_status(status, move |response| {
            *destination = response.json()?;
            Ok(())
        })
    }

    /// Dispatches the response to the handler registered for its status.
    ///
    /// The response body is closed when this returns, whatever the path.
    ///
    /// # Errors
    ///
    /// - the error captured while building or executing the request,
    /// - [`Error::BodyTooLarge`] if the declared length exceeds the read limit,
    /// - the error returned by the handler,
    /// - [`Error::UnhandledStatus`] if no handler is registered for the status.
    pub fn resolve(mut self) -> Result<()> {
        let mut response = self.outcome?;

        match self.read_limit.effective(response.content_length) {
            Ok(Some(limit)) => response.body.limit(limit),
            Ok(None) => {}
            Err(LimitExceeded {
                content_length,
                limit,
            }) => {
                return Err(Error::BodyTooLarge {
                    context: response.context(),
                    content_length,
                    limit,
                });
            }
        }

        if let Some(handler) = self.handlers.remove(&response.status) {
            return handler(&mut response);
        }

        let mut body = Vec::new();
        // read errors are ignored, whatever was read is reported
        let _ = response.body.read_to_end(&mut body);

        Err(Error::UnhandledStatus {
            context: response.context(),
            body: BodyDump::new(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::{self, Cursor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use derive_more::Display;

    use super::*;

    #[derive(Debug, Display, derive_more::Error)]
    #[display("not found")]
    struct NotFound;

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    struct CreatedUser {
        user_id: u64,
    }

    /// Reader counting how many times it is dropped.
    struct Tracked {
        inner: Cursor<Vec<u8>>,
        drops: Arc<AtomicUsize>,
    }

    impl Read for Tracked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked_response(status: u16, body: &str) -> (Response, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let reader = Tracked {
            inner: Cursor::new(body.as_bytes().to_vec()),
            drops: Arc::clone(&drops),
        };
        let response = Response::new(status, HeaderMap::new(), Body::from_reader(reader))
            .with_content_length(Some(body.len() as u64));
        (response, drops)
    }

    fn response(status: u16, body: &'static str) -> Response {
        let mut response = Response::new(status, HeaderMap::new(), body);
        response.set_origin(
            http::Method::GET,
            Url::parse("https://api.example.com/users").expect("url"),
        );
        response
    }

    #[test]
    fn response_basic() {
        let response = Response::new(200, HeaderMap::new(), r#"{"id":1}"#)
            .with_header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );

        check!(response.status() == 200);
        check!(response.header("content-type") == Some("application/json"));
        check!(response.content_length() == Some(8));
        check!(response.is_success());
        check!(!response.is_client_error());
        check!(!response.is_server_error());
    }

    #[test]
    fn response_status_checks() {
        check!(Response::new(301, HeaderMap::new(), "").is_redirection());
        check!(Response::new(404, HeaderMap::new(), "").is_client_error());
        check!(Response::new(500, HeaderMap::new(), "").is_server_error());
    }

    #[test]
    fn content_length_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("14"));
        let response = Response::new(200, headers, Body::from_reader(io::empty()));
        check!(response.content_length() == Some(14));

        let response = Response::new(200, HeaderMap::new(), Body::from_reader(io::empty()));
        check!(response.content_length().is_none());
    }

    #[test]
    fn response_text() {
        let mut response = Response::new(200, HeaderMap::new(), "Hello, World!");
        check!(response.text().expect("text") == "Hello, World!");
    }

    #[test]
    fn read_limit_within_declared_length() {
        let payload = r#"{"user_id":42}"#;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("14"));
        let response = Response::new(
            200,
            headers,
            Body::from_reader(Cursor::new(payload.as_bytes().to_vec())),
        );

        let mut read = Vec::new();
        ResponseBuilder::new(Ok(response))
            .read_limit(ReadLimit::from(20_i64))
            .on_status(200, |response| {
                response.body_mut().read_to_end(&mut read)?;
                Ok(())
            })
            .resolve()
            .expect("resolved");

        check!(read.len() == 14);
    }

    #[test]
    fn read_limit_below_declared_length() {
        let result = ResponseBuilder::new(Ok(response(200, r#"{"user_id":42}"#)))
            .read_limit(ReadLimit::from(2_i64))
            .success_on_status(200)
            .resolve();

        let_assert!(Err(err @ Error::BodyTooLarge { .. }) = result);
        insta::assert_snapshot!(
            err.to_string(),
            @"request GET https://api.example.com/users failed with status 200: content length 14 is above read limit 2"
        );
    }

    #[test]
    fn read_limit_without_declared_length() {
        let body = || Body::from_reader(Cursor::new(b"hello world!".to_vec()));

        let mut read = String::new();
        ResponseBuilder::new(Ok(Response::new(200, HeaderMap::new(), body())))
            .read_limit(ReadLimit::Bytes(5))
            .on_status(200, |response| {
                read = response.text()?;
                Ok(())
            })
            .resolve()
            .expect("resolved");
        check!(read == "hello");

        let mut read = String::from("untouched");
        ResponseBuilder::new(Ok(Response::new(200, HeaderMap::new(), body())))
            .on_status(200, |response| {
                read = response.text()?;
                Ok(())
            })
            .resolve()
            .expect("resolved");
        check!(read.is_empty());

        let mut read = String::new();
        ResponseBuilder::new(Ok(Response::new(200, HeaderMap::new(), body())))
            .read_limit(ReadLimit::Unlimited)
            .on_status(200, |response| {
                read = response.text()?;
                Ok(())
            })
            .resolve()
            .expect("resolved");
        check!(read == "hello world!");
    }

    #[test]
    fn receive_json_decodes_into_destination() {
        let mut user = CreatedUser::default();
        ResponseBuilder::new(Ok(response(201, r#"{"user_id":42}"#)))
            .receive_json(201, &mut user)
            .resolve()
            .expect("resolved");

        check!(user == CreatedUser { user_id: 42 });
    }

    #[test]
    fn receive_json_ignores_trailing_bytes() {
        let mut user = CreatedUser::default();
        ResponseBuilder::new(Ok(response(201, r#"{"user_id":42}   trailing"#)))
            .receive_json(201, &mut user)
            .resolve()
            .expect("resolved");

        check!(user.user_id == 42);
    }

    #[test]
    fn receive_json_reports_decoding_path() {
        let mut user = CreatedUser::default();
        let result = ResponseBuilder::new(Ok(response(201, r#"{"user_id":"forty-two"}"#)))
            .receive_json(201, &mut user)
            .resolve();

        let_assert!(Err(Error::JsonDecode { context, path, .. }) = result);
        check!(context.status == 201);
        check!(path == "user_id");
        check!(user.user_id == 0);
    }

    #[test]
    fn receive_json_reports_truncated_body() {
        let mut user = CreatedUser::default();
        let result = ResponseBuilder::new(Ok(response(201, r#"{"user_id":"#)))
            .receive_json(201, &mut user)
            .resolve();

        let_assert!(Err(err @ Error::JsonDecode { .. }) = result);
        check!(err.to_string().contains("unable to parse JSON response body"));

        let_assert!(Some(source) = std::error::Error::source(&err));
        let_assert!(Some(cause) = source.downcast_ref::<serde_json::Error>());
        check!(cause.is_eof());
    }

    #[test]
    fn unhandled_status_dumps_body() {
        let result = ResponseBuilder::new(Ok(response(500, r#""hello world!""#)))
            .success_on_status(200)
            .resolve();

        let_assert!(Err(err) = result);
        insta::assert_snapshot!(
            err.to_string(),
            @r#"request GET https://api.example.com/users failed with status 500: unhandled status with b64 body ImhlbGxvIHdvcmxkISI="#
        );
        check!(err.status() == Some(500));
    }

    #[test]
    fn unhandled_status_without_body() {
        let result = ResponseBuilder::new(Ok(response(404, ""))).resolve();

        let_assert!(Err(err) = result);
        check!(err.to_string().contains("unhandled status"));
        check!(!err.to_string().contains("b64 body"));
    }

    #[test]
    fn captured_error_is_returned_first() {
        let result = ResponseBuilder::new(Err(Error::Timeout))
            .success_on_status(200)
            .resolve();
        let_assert!(Err(Error::Timeout) = result);
    }

    #[test]
    fn error_on_status_keeps_identity() {
        let result = ResponseBuilder::new(Ok(response(404, "")))
            .error_on_status(404, NotFound)
            .resolve();

        let_assert!(Err(err) = result);
        check!(err.is::<NotFound>());
        check!(err.to_string() == "not found");
    }

    #[test]
    fn last_registration_wins() {
        let result = ResponseBuilder::new(Ok(response(404, "")))
            .success_on_status(404)
            .error_on_status(404, NotFound)
            .resolve();
        let_assert!(Err(err) = result);
        check!(err.is::<NotFound>());

        let result = ResponseBuilder::new(Ok(response(404, "")))
            .error_on_status(404, NotFound)
            .success_on_status(404)
            .resolve();
        check!(result.is_ok());
    }

    #[test]
    fn handler_invoked_exactly_once() {
        let calls = Cell::new(0);
        ResponseBuilder::new(Ok(response(204, "")))
            .on_statuses([200, 204], |_| {
                calls.set(calls.get() + 1);
                Ok(())
            })
            .resolve()
            .expect("resolved");

        check!(calls.get() == 1);
    }

    #[test]
    fn success_on_statuses() {
        for status in [200, 201, 204] {
            let result = ResponseBuilder::new(Ok(response(status, "")))
                .success_on_statuses([200, 201, 204])
                .resolve();
            check!(result.is_ok(), "status {status}");
        }
    }

    #[test]
    fn body_closed_once_on_every_path() {
        let (handled, drops) = tracked_response(200, "ok");
        ResponseBuilder::new(Ok(handled))
            .success_on_status(200)
            .resolve()
            .expect("resolved");
        check!(drops.load(Ordering::SeqCst) == 1);

        let (unhandled, drops) = tracked_response(500, "boom");
        let _ = ResponseBuilder::new(Ok(unhandled)).resolve();
        check!(drops.load(Ordering::SeqCst) == 1);

        let (too_large, drops) = tracked_response(200, "way too large");
        let _ = ResponseBuilder::new(Ok(too_large))
            .read_limit(ReadLimit::Bytes(1))
            .resolve();
        check!(drops.load(Ordering::SeqCst) == 1);

        let (failing, drops) = tracked_response(201, "{");
        let mut user = CreatedUser::default();
        let _ = ResponseBuilder::new(Ok(failing))
            .receive_json(201, &mut user)
            .resolve();
        check!(drops.load(Ordering::SeqCst) == 1);
    }
}
