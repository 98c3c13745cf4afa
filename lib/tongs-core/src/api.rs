//! Preconfigured API client.
//!
//! [`Api`] holds what every request to a given server shares: the
//! [`Doer`], the base URL, default headers, default response handlers and a
//! default read limit.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tongs_core::{Api, Response, doer_fn};
//!
//! #[derive(Debug, derive_more::Display, derive_more::Error)]
//! #[display("unauthorized")]
//! struct Unauthorized;
//!
//! let doer = doer_fn(|_| Ok(Response::new(401, http::HeaderMap::new(), "")));
//! let api = Api::parse(Arc::new(doer), "https://api.example.com")
//!     .expect("valid url")
//!     .with_response_handler(401, |_| Err(tongs_core::Error::custom(Unauthorized)));
//!
//! let err = api
//!     .resolve(api.get("/me"))
//!     .expect_err("unauthorized");
//! assert!(err.is::<Unauthorized>());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use url::Url;

use crate::{
    DEFAULT_READ_LIMIT, Doer, Error, ReadLimit, Request, RequestBuilder, RequestOverride, Response,
    ResponseBuilder, Result,
};

/// Response handler registered on an [`Api`] for every request.
pub type ResponseHandler = Arc<dyn Fn(&mut Response) -> Result<()> + Send + Sync>;

/// Client for a given server, applying shared defaults to every request.
///
/// Cloning is cheap: the doer and handlers are shared, headers are copied.
#[derive(Clone)]
pub struct Api {
    doer: Arc<dyn Doer>,
    base_url: Url,
    default_headers: HeaderMap,
    default_handlers: HashMap<u16, ResponseHandler>,
    default_read_limit: ReadLimit,
    default_override: Option<RequestOverride>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses = self.default_handlers.keys().copied().collect::<Vec<_>>();
        statuses.sort_unstable();

        f.debug_struct("Api")
            .field("base_url", &self.base_url.as_str())
            .field("default_headers", &self.default_headers)
            .field("default_handled_statuses", &statuses)
            .field("default_read_limit", &self.default_read_limit)
            .field("has_override", &self.default_override.is_some())
            .finish_non_exhaustive()
    }
}

impl Api {
    /// Creates an API client for the server at `base_url`.
    ///
    /// The default read limit is [`DEFAULT_READ_LIMIT`] bytes.
    #[must_use]
    pub fn new(doer: Arc<dyn Doer>, base_url: Url) -> Self {
        Self {
            doer,
            base_url,
            default_headers: HeaderMap::new(),
            default_handlers: HashMap::new(),
            default_read_limit: ReadLimit::Bytes(DEFAULT_READ_LIMIT),
            default_override: None,
        }
    }

    /// Creates an API client, parsing `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `base_url` is not a valid URL.
    pub fn parse(doer: Arc<dyn Doer>, base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|source| Error::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self::new(doer, url))
    }

    /// Sets default request headers.
    ///
    /// Each header present in `headers` replaces any previous default with the
    /// same name.
    #[must_use]
    pub fn with_request_headers(mut self, headers: &HeaderMap) -> Self {
        for name in headers.keys() {
            self.default_headers.remove(name);
        }
        for (name, value) in headers {
            self.default_headers.append(name.clone(), value.clone());
        }
        self
    }

    /// Sets one default request header.
    #[must_use]
    pub fn with_request_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Registers a handler applied to every response with `status`, unless
    /// the request registers its own.
    #[must_use]
    pub fn with_response_handler<F>(mut self, status: u16, handler: F) -> Self
    where
        F: Fn(&mut Response) -> Result<()> + Send + Sync + 'static,
    {
        self.default_handlers.insert(status, Arc::new(handler));
        self
    }

    /// Sets the default read limit.
    #[must_use]
    pub const fn with_response_read_limit(mut self, read_limit: ReadLimit) -> Self {
        self.default_read_limit = read_limit;
        self
    }

    /// Sets a hook applied to every finalized request, e.g. to sign it.
    #[must_use]
    pub fn with_request_override<F>(mut self, hook: F) -> Self
    where
        F: Fn(Request) -> Result<Request> + Send + Sync + 'static,
    {
        self.default_override = Some(Arc::new(hook));
        self
    }

    /// Base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Default request headers.
    #[must_use]
    pub const fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Default read limit.
    #[must_use]
    pub const fn default_read_limit(&self) -> ReadLimit {
        self.default_read_limit
    }

    /// Shared doer.
    #[must_use]
    pub fn doer(&self) -> &dyn Doer {
        self.doer.as_ref()
    }

    /// URL of `endpoint`, appended to the base URL path.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use tongs_core::{Api, Response, doer_fn};
    /// # let doer = Arc::new(doer_fn(|_| Ok(Response::new(204, http::HeaderMap::new(), ""))));
    /// let api = Api::parse(doer, "https://api.example.com/v1").expect("valid url");
    /// assert_eq!(api.url("/users").as_str(), "https://api.example.com/v1/users");
    /// ```
    #[must_use]
    pub fn url(&self, endpoint: &str) -> Url {
        let mut url = self.base_url.clone();
        let base = url.path();
        let path = if endpoint.starts_with('/') {
            format!("{}{endpoint}", base.trim_end_matches('/'))
        } else {
            format!("{base}{endpoint}")
        };
        url.set_path(&path);
        url
    }

    /// Request builder for `method` on `endpoint`, with the default headers
    /// and override hook.
    pub fn request(&self, method: impl AsRef<str>, endpoint: &str) -> RequestBuilder {
        let builder = RequestBuilder::from_url(method, self.url(endpoint))
            .set_headers(&self.default_headers);

        match &self.default_override {
            Some(hook) => builder.with_override(Arc::clone(hook)),
            None => builder,
        }
    }

    /// `HEAD` request builder.
    pub fn head(&self, endpoint: &str) -> RequestBuilder {
        self.request("HEAD", endpoint)
    }

    /// `GET` request builder.
    pub fn get(&self, endpoint: &str) -> RequestBuilder {
        self.request("GET", endpoint)
    }

    /// `POST` request builder.
    pub fn post(&self, endpoint: &str) -> RequestBuilder {
        self.request("POST", endpoint)
    }

    /// `PUT` request builder.
    pub fn put(&self, endpoint: &str) -> RequestBuilder {
        self.request("PUT", endpoint)
    }

    /// `PATCH` request builder.
    pub fn patch(&self, endpoint: &str) -> RequestBuilder {
        self.request("PATCH", endpoint)
    }

    /// `DELETE` request builder.
    pub fn delete(&self, endpoint: &str) -> RequestBuilder {
        self.request("DELETE", endpoint)
    }

    /// Executes `request` with the shared doer, then applies the default read
    /// limit and handlers.
    ///
    /// Handlers registered on the returned builder take precedence over the
    /// defaults.
    pub fn execute<'a>(&self, request: RequestBuilder) -> ResponseBuilder<'a> {
        let mut response = request
            .execute(self.doer.as_ref())
            .read_limit(self.default_read_limit);

        for (status, handler) in &self.default_handlers {
            let handler = Arc::clone(handler);
            response = response.on_status(*status, move |response| handler(response));
        }

        response
    }

    /// Executes `request` and resolves the response with the defaults only.
    ///
    /// # Errors
    ///
    /// See [`ResponseBuilder::resolve`].
    pub fn resolve(&self, request: RequestBuilder) -> Result<()> {
        self.execute(request).resolve()
    }
}
