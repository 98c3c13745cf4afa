//! Request execution.
//!
//! A [`Doer`] turns a finalized [`Request`] into a [`Response`]. The builders
//! only ever talk to this trait: the `tongs` crate provides a hyper-based
//! implementation and logging/dumping wrappers, `tongs-test` provides stubs
//! and spies.

use std::sync::Arc;

use crate::{Request, Response, Result};

/// Executes HTTP requests.
///
/// # Example
///
/// ```
/// use tongs_core::{Doer, Request, Response, Result};
///
/// struct AlwaysNoContent;
///
/// impl Doer for AlwaysNoContent {
///     fn execute(&self, _request: Request) -> Result<Response> {
///         Ok(Response::new(204, http::HeaderMap::new(), ""))
///     }
/// }
/// ```
pub trait Doer: Send + Sync {
    /// Execute a request and return the response.
    ///
    /// A response with any status, including 4xx and 5xx, is a success here:
    /// interpreting the status is the job of the
    /// [`ResponseBuilder`](crate::ResponseBuilder).
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained, e.g. on network,
    /// TLS or timeout failures.
    fn execute(&self, request: Request) -> Result<Response>;
}

impl<D: Doer + ?Sized> Doer for &D {
    fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request)
    }
}

impl<D: Doer + ?Sized> Doer for Box<D> {
    fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request)
    }
}

impl<D: Doer + ?Sized> Doer for Arc<D> {
    fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request)
    }
}

/// [`Doer`] backed by a closure, see [`doer_fn`].
#[derive(Clone, Copy)]
pub struct DoerFn<F>(F);

impl<F> std::fmt::Debug for DoerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DoerFn").finish_non_exhaustive()
    }
}

impl<F> Doer for DoerFn<F>
where
    F: Fn(Request) -> Result<Response> + Send + Sync,
{
    fn execute(&self, request: Request) -> Result<Response> {
        (self.0)(request)
    }
}

/// Wraps a closure into a [`Doer`].
///
/// ```
/// use tongs_core::{RequestBuilder, Response, doer_fn};
///
/// let doer = doer_fn(|request| {
///     assert_eq!(request.url().path(), "/health");
///     Ok(Response::new(204, http::HeaderMap::new(), ""))
/// });
///
/// RequestBuilder::new("GET", "https://api.example.com/health")
///     .execute(&doer)
///     .success_on_status(204)
///     .resolve()
///     .expect("healthy");
/// ```
pub const fn doer_fn<F>(f: F) -> DoerFn<F>
where
    F: Fn(Request) -> Result<Response> + Send + Sync,
{
    DoerFn(f)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use http::HeaderMap;

    use super::*;
    use crate::{Error, RequestBuilder};

    #[test]
    fn doer_fn_receives_finalized_request() {
        let doer = doer_fn(|request| {
            check!(request.method() == &http::Method::POST);
            check!(request.header("content-type") == Some("application/json"));
            Ok(Response::new(201, HeaderMap::new(), ""))
        });

        RequestBuilder::new("POST", "https://api.example.com/users")
            .send_json(serde_json::json!({"name": "alice"}))
            .execute(&doer)
            .success_on_status(201)
            .resolve()
            .expect("resolved");
    }

    #[test]
    fn doer_through_pointers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let doer: Arc<dyn Doer> = Arc::new(doer_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Response::new(204, HeaderMap::new(), ""))
        }));
        let boxed: Box<dyn Doer> = Box::new(Arc::clone(&doer));

        for executor in [&doer as &dyn Doer, &boxed, &&boxed] {
            RequestBuilder::new("GET", "https://api.example.com")
                .execute(executor)
                .success_on_status(204)
                .resolve()
                .expect("resolved");
        }

        check!(calls.load(Ordering::SeqCst) == 3);
    }

    #[test]
    fn execution_failure_is_wrapped() {
        let doer = doer_fn(|_| Err(Error::connection("refused")));

        let result = RequestBuilder::new("GET", "https://api.example.com/users")
            .execute(&doer)
            .success_on_status(200)
            .resolve();

        let_assert!(Err(err @ Error::Execution { .. }) = result);
        check!(err.is_connection());
        check!(
            err.to_string()
                == "unable to execute GET https://api.example.com/users request: connection error: refused"
        );
    }

    #[test]
    fn finalize_failure_skips_doer() {
        let doer = doer_fn(|_| unreachable!("must not be called"));

        let result = RequestBuilder::new("POST", "https://api.example.com")
            .send_object(42)
            .execute(&doer)
            .resolve();

        let_assert!(Err(Error::SerializerMissing) = result);
    }

    #[test]
    fn response_is_stamped_with_request_origin() {
        let doer = doer_fn(|_| Ok(Response::new(500, HeaderMap::new(), "")));

        let result = RequestBuilder::new("DELETE", "https://api.example.com/users/1")
            .execute(&doer)
            .resolve();

        let_assert!(Err(err) = result);
        let_assert!(Some(context) = err.context());
        check!(context.method == "DELETE");
        check!(context.url == "https://api.example.com/users/1");
    }
}
