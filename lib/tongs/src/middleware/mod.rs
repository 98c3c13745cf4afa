//! [`Doer`] middleware.
//!
//! Middleware wraps a doer into another doer, so it composes with any
//! implementation: [`HyperDoer`](crate::HyperDoer), a test stub, or another
//! middleware.
//!
//! - [`Logging`] - Logs requests/responses using `tracing`
//! - [`DumpDoer`] - Hands base64 dumps of each exchange to a callback
//!
//! # Example
//!
//! ```no_run
//! use tongs::HyperDoer;
//! use tongs::middleware::DoerExt;
//!
//! let doer = HyperDoer::new()?
//!     .dump_b64(|request, response| tracing::trace!(request, response, "exchange"))
//!     .with_logging();
//! # Ok::<(), tongs::Error>(())
//! ```

mod dump;
mod logging;

pub use dump::DumpDoer;
pub use logging::{LogLevel, Logging};

use crate::Doer;

/// Extension methods wrapping a [`Doer`] into middleware.
pub trait DoerExt: Doer + Sized {
    /// Log requests and responses at info level.
    fn with_logging(self) -> Logging<Self> {
        Logging::new(self)
    }

    /// Log requests and responses at debug level, headers included.
    fn with_debug_logging(self) -> Logging<Self> {
        Logging::debug(self)
    }

    /// Hand base64 dumps of each exchange to `dump`.
    fn dump_b64<F>(self, dump: F) -> DumpDoer<Self>
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        DumpDoer::new(self, dump)
    }
}

impl<D: Doer> DoerExt for D {}

#[cfg(test)]
mod tests {
    use assert2::check;
    use http::HeaderMap;

    use super::*;
    use crate::{RequestBuilder, Response, doer_fn};

    #[test]
    fn middleware_composes() {
        let doer = doer_fn(|_| Ok(Response::new(204, HeaderMap::new(), "")))
            .dump_b64(|_, _| {})
            .with_debug_logging();
        check!(doer.level() == LogLevel::Debug);

        let result = RequestBuilder::new("GET", "https://api.example.com")
            .execute(&doer)
            .success_on_status(204)
            .resolve();
        check!(result.is_ok());
    }
}
