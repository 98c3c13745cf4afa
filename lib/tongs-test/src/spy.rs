//! Recording doer.

use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use http::{HeaderMap, Method};
use tongs_core::{Doer, Request, Response, Result};
use url::Url;

/// Status and headers of a response seen by a [`DoerSpy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiedResponse {
    /// Response status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
}

/// One execution seen by a [`DoerSpy`].
#[derive(Debug, Clone)]
pub struct DoerSpyRecord {
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// The response, or the rendered error of the inner doer.
    pub outcome: std::result::Result<SpiedResponse, String>,
}

/// [`Doer`] recording every request and outcome of an inner doer.
///
/// Request bodies are buffered to be recorded, the inner doer still gets
/// them whole. Response bodies are left untouched.
///
/// # Example
///
/// ```
/// use tongs_core::{RequestBuilder, Response, doer_fn};
/// use tongs_test::DoerSpy;
///
/// let spy = DoerSpy::new(doer_fn(|_| Ok(Response::new(204, http::HeaderMap::new(), ""))));
///
/// RequestBuilder::new("DELETE", "https://api.example.com/users/1")
///     .execute(&spy)
///     .success_on_status(204)
///     .resolve()
///     .expect("deleted");
///
/// let calls = spy.calls();
/// assert_eq!(calls.len(), 1);
/// assert_eq!(calls[0].url.path(), "/users/1");
/// ```
#[derive(Debug)]
pub struct DoerSpy<D> {
    inner: D,
    calls: Mutex<Vec<DoerSpyRecord>>,
}

impl<D> DoerSpy<D> {
    /// Spy on `inner`.
    pub const fn new(inner: D) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The spied doer.
    pub const fn inner(&self) -> &D {
        &self.inner
    }

    /// Recorded executions, oldest first. The records are cleared.
    pub fn calls(&self) -> Vec<DoerSpyRecord> {
        std::mem::take(&mut *self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<D: Doer> Doer for DoerSpy<D> {
    fn execute(&self, mut request: Request) -> Result<Response> {
        // an unreadable body is recorded empty, the inner doer reports the failure
        let body = request.body_mut().buffer().cloned().unwrap_or_default();
        let method = request.method().clone();
        let url = request.url().clone();
        let headers = request.headers().clone();

        let result = self.inner.execute(request);

        let outcome = match &result {
            Ok(response) => Ok(SpiedResponse {
                status: response.status(),
                headers: response.headers().clone(),
            }),
            Err(err) => Err(err.to_string()),
        };
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DoerSpyRecord {
                method,
                url,
                headers,
                body,
                outcome,
            });

        result
    }
}
