//! Canned responses.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use derive_more::{Display, Error};
use tongs_core::{Doer, Error, Request, Response, Result};

use crate::{Mismatch, RequestMatcher};

/// Why a [`DoerStub`] could not answer a request.
///
/// Surfaces wrapped in [`Error::Custom`], use
/// [`Error::downcast_ref`] to inspect it.
#[derive(Debug, Display, Error)]
pub enum StubError {
    /// No configured call is left for this request.
    #[display("http doer not configured for this call")]
    NotConfigured,

    /// In strict order, the next configured call did not match.
    #[display("request does not match: {_0}")]
    Mismatch(Mismatch),
}

/// One configured call of a [`DoerStub`]: an optional matcher and the
/// outcome to return.
pub struct DoerStubCall {
    matcher: Option<Box<dyn RequestMatcher>>,
    outcome: Result<Response>,
}

impl fmt::Debug for DoerStubCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoerStubCall")
            .field("matcher", &self.matcher.is_some())
            .field("outcome", &self.outcome.as_ref().map(Response::status))
            .finish()
    }
}

impl DoerStubCall {
    /// A call answering `response`.
    #[must_use]
    pub fn respond(response: Response) -> Self {
        Self {
            matcher: None,
            outcome: Ok(response),
        }
    }

    /// A call failing with `error`.
    #[must_use]
    pub fn fail(error: Error) -> Self {
        Self {
            matcher: None,
            outcome: Err(error),
        }
    }

    /// Only answer requests accepted by `matcher`.
    #[must_use]
    pub fn when<M>(mut self, matcher: M) -> Self
    where
        M: RequestMatcher + 'static,
    {
        self.matcher = Some(Box::new(matcher));
        self
    }
}

/// [`Doer`] replaying configured calls, each one at most once.
///
/// For each request, the first remaining call whose matcher accepts it (or
/// which has no matcher) is used and removed. With strict order, only the
/// first remaining call is considered and a mismatch is an error.
///
/// # Example
///
/// ```
/// use tongs_core::{RequestBuilder, Response};
/// use tongs_test::{DoerStub, DoerStubCall, RequestMatcherBuilder};
///
/// let doer = DoerStub::new([
///     DoerStubCall::respond(Response::new(204, http::HeaderMap::new(), ""))
///         .when(RequestMatcherBuilder::new().method("DELETE")),
/// ]);
///
/// RequestBuilder::new("DELETE", "https://api.example.com/users/1")
///     .execute(&doer)
///     .success_on_status(204)
///     .resolve()
///     .expect("deleted");
///
/// assert_eq!(doer.remaining(), 0);
/// ```
#[derive(Debug)]
pub struct DoerStub {
    strict_order: bool,
    calls: Mutex<Vec<DoerStubCall>>,
}

impl DoerStub {
    /// A stub picking the first matching call.
    pub fn new(calls: impl IntoIterator<Item = DoerStubCall>) -> Self {
        Self {
            strict_order: false,
            calls: Mutex::new(calls.into_iter().collect()),
        }
    }

    /// A stub expecting calls in the configured order.
    pub fn strict(calls: impl IntoIterator<Item = DoerStubCall>) -> Self {
        Self {
            strict_order: true,
            ..Self::new(calls)
        }
    }

    /// Whether calls must happen in the configured order.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict_order
    }

    /// Number of configured calls not used yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Doer for DoerStub {
    fn execute(&self, mut request: Request) -> Result<Response> {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);

        let mut selected = None;
        for (index, call) in calls.iter().enumerate() {
            let Some(matcher) = &call.matcher else {
                selected = Some(index);
                break;
            };

            match matcher.match_request(&mut request) {
                Ok(()) => {
                    selected = Some(index);
                    break;
                }
                Err(mismatch) if self.strict_order => {
                    return Err(Error::custom(StubError::Mismatch(mismatch)));
                }
                Err(mismatch) => {
                    tracing::trace!(%mismatch, index, "stub call skipped");
                }
            }
        }

        let index = selected.ok_or_else(|| Error::custom(StubError::NotConfigured))?;
        calls.remove(index).outcome
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::cell::Cell;

    use assert2::{check, let_assert};
    use http::HeaderMap;
    use tongs_core::RequestBuilder;

    use super::*;
    use crate::RequestMatcherBuilder;

    fn respond(status: u16) -> DoerStubCall {
        DoerStubCall::respond(Response::new(status, HeaderMap::new(), ""))
    }

    fn status(doer: &DoerStub, method: &str) -> Result<u16> {
        let status = Cell::new(0);
        RequestBuilder::new(method, "https://api.example.com/")
            .execute(doer)
            .on_statuses([200, 201, 202, 204], |response| {
                status.set(response.status());
                Ok(())
            })
            .resolve()
            .map(|()| status.get())
    }

    #[test]
    fn should_answer_calls_in_order_without_matchers() {
        let doer = DoerStub::new([respond(200), respond(201)]);

        check!(doer.remaining() == 2);
        check!(status(&doer, "GET").expect("first") == 200);
        check!(status(&doer, "GET").expect("second") == 201);
        check!(doer.remaining() == 0);
    }

    #[test]
    fn should_fail_when_no_call_is_left() {
        let doer = DoerStub::new(Vec::<DoerStubCall>::new());

        let_assert!(Err(err) = status(&doer, "GET"));
        check!(err.is::<StubError>());
        check!(err.to_string().ends_with("http doer not configured for this call"));
    }

    #[test]
    fn should_pick_first_matching_call() {
        let doer = DoerStub::new([
            respond(201).when(RequestMatcherBuilder::new().method("POST")),
            respond(200).when(RequestMatcherBuilder::new().method("GET")),
        ]);

        check!(status(&doer, "GET").expect("get") == 200);
        check!(status(&doer, "POST").expect("post") == 201);
        check!(doer.remaining() == 0);
    }

    #[test]
    fn should_reject_out_of_order_calls_when_strict() {
        let doer = DoerStub::strict([
            respond(201).when(RequestMatcherBuilder::new().method("POST")),
            respond(200).when(RequestMatcherBuilder::new().method("GET")),
        ]);
        check!(doer.is_strict());

        let_assert!(Err(err) = status(&doer, "GET"));
        let_assert!(Some(StubError::Mismatch(mismatch)) = err.downcast_ref::<StubError>());
        check!(mismatch.reasons() == [r#"request method "GET" != "POST""#]);
        check!(doer.remaining() == 2);

        check!(status(&doer, "POST").expect("post") == 201);
        check!(status(&doer, "GET").expect("get") == 200);
    }

    #[test]
    fn should_skip_mismatching_calls_when_not_strict() {
        let doer = DoerStub::new([respond(201).when(RequestMatcherBuilder::new().method("POST"))]);

        let_assert!(Err(err) = status(&doer, "GET"));
        check!(err.is::<StubError>());
        check!(doer.remaining() == 1);
    }

    #[test]
    fn should_replay_configured_errors() {
        let doer = DoerStub::new([DoerStubCall::fail(Error::connection("connection refused"))]);

        let_assert!(Err(err) = status(&doer, "GET"));
        check!(err.is_connection());
        check!(doer.remaining() == 0);
    }
}
