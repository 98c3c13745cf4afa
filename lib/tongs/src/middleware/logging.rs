//! Request/response logging middleware.
//!
//! This middleware logs HTTP requests and responses using the `tracing` crate.

use std::time::Instant;

use tracing::{Level, debug, info, span, warn};

use crate::{Doer, Request, Response, Result, redacted_url};

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Doer that logs requests and responses.
///
/// # Example
///
/// ```
/// use tongs::middleware::Logging;
/// use tongs::{RequestBuilder, Response, doer_fn};
///
/// let doer = Logging::debug(doer_fn(|_| Ok(Response::new(204, http::HeaderMap::new(), ""))));
///
/// RequestBuilder::new("GET", "https://api.example.com/health")
///     .execute(&doer)
///     .success_on_status(204)
///     .resolve()
///     .expect("healthy");
/// ```
#[derive(Debug, Clone)]
pub struct Logging<D> {
    inner: D,
    level: LogLevel,
}

impl<D> Logging<D> {
    /// Wrap `inner`, logging summaries at info level.
    pub const fn new(inner: D) -> Self {
        Self {
            inner,
            level: LogLevel::Info,
        }
    }

    /// Wrap `inner`, logging details at debug level.
    pub const fn debug(inner: D) -> Self {
        Self {
            inner,
            level: LogLevel::Debug,
        }
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// Wrapped doer.
    pub const fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: Doer> Doer for Logging<D> {
    fn execute(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = redacted_url(request.url());

        let span = span!(Level::INFO, "http_request", %method, %url);
        let _entered = span.enter();

        match self.level {
            LogLevel::Debug => {
                debug!(
                    method = %method,
                    url = %url,
                    headers = ?request.headers(),
                    "sending request"
                );
            }
            LogLevel::Info => {
                info!(method = %method, url = %url, "sending request");
            }
        }

        let start = Instant::now();
        let result = self.inner.execute(request);

        // Saturating conversion to u64 (truncates after ~584 million years)
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(response) => {
                let status = response.status();
                if self.level == LogLevel::Debug {
                    debug!(status, elapsed_ms, headers = ?response.headers(), "response headers");
                }
                if response.is_success() {
                    info!(status, elapsed_ms, "request completed");
                } else {
                    warn!(status, elapsed_ms, "request failed with HTTP error");
                }
            }
            Err(err) => {
                warn!(error = %err, elapsed_ms, "request failed");
            }
        }

        result
    }
}
