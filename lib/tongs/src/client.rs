//! Blocking HTTP doer using hyper-util.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::{Buf, Bytes};
use http::HeaderValue;
use http::header::{AUTHORIZATION, USER_AGENT};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::{TokioExecutor, TokioTimer},
};
use percent_encoding::percent_decode_str;
use tokio::runtime::Runtime;
use tracing::debug;
use url::Url;

use crate::{
    Body, Doer, Error, Request, Response, Result,
    config::{ClientConfig, ClientConfigBuilder},
    connector::https_connector,
    redacted_url,
};

/// [`Doer`] backed by a pooled hyper client, with TLS through rustls.
///
/// Requests are executed on a runtime owned by the doer: calls block the
/// current thread until response headers arrive, and reading the response
/// body blocks until each chunk arrives. It must not be used from within an
/// async context, use `tokio::task::spawn_blocking` there.
///
/// # Example
///
/// ```no_run
/// use tongs::{HyperDoer, RequestBuilder};
///
/// let doer = HyperDoer::new()?;
///
/// RequestBuilder::new("GET", "https://api.example.com/health")
///     .execute(&doer)
///     .success_on_status(204)
///     .resolve()?;
/// # Ok::<(), tongs::Error>(())
/// ```
#[derive(Clone)]
pub struct HyperDoer {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    runtime: Arc<Runtime>,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperDoer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperDoer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperDoer {
    /// Create a new doer with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new doer with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::connection(format!("unable to start runtime: {e}")))?;

        let inner = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(&config));

        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
            config,
        })
    }

    /// Create a new doer builder.
    #[must_use]
    pub fn builder() -> HyperDoerBuilder {
        HyperDoerBuilder::default()
    }

    /// Get the doer configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_hyper_request(&self, request: Request) -> Result<http::Request<Full<Bytes>>> {
        let (method, mut url, mut headers, mut body) = request.into_parts();
        let payload = body.read_all()?;

        if let Some(credentials) = basic_credentials(&url) {
            if !headers.contains_key(AUTHORIZATION) {
                let mut value = HeaderValue::from_str(&credentials).map_err(|e| {
                    Error::InvalidHeader {
                        name: AUTHORIZATION.to_string(),
                        message: e.to_string(),
                    }
                })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            // credentials never go on the wire as part of the URI
            let _ = url.set_username("");
            let _ = url.set_password(None);
        }

        if !headers.contains_key(USER_AGENT) {
            let user_agent = HeaderValue::from_str(&self.config.user_agent).map_err(|e| {
                Error::InvalidHeader {
                    name: USER_AGENT.to_string(),
                    message: e.to_string(),
                }
            })?;
            headers.insert(USER_AGENT, user_agent);
        }

        let mut http_request = http::Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .body(Full::new(payload))
            .map_err(|e| Error::RequestConstruction {
                method: method.to_string(),
                url: redacted_url(&url),
                message: e.to_string(),
            })?;
        *http_request.headers_mut() = headers;

        Ok(http_request)
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();
        let detail = std::error::Error::source(&err)
            .map(ToString::to_string)
            .unwrap_or_default();

        if err.is_connect() {
            return Error::connection(format!("{msg}: {detail}"));
        }

        let lower = detail.to_ascii_lowercase();
        if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
            return Error::tls(format!("{msg}: {detail}"));
        }

        Error::connection(msg)
    }
}

impl Doer for HyperDoer {
    fn execute(&self, request: Request) -> Result<Response> {
        let hyper_request = self.build_hyper_request(request)?;
        debug!(
            method = %hyper_request.method(),
            uri = %hyper_request.uri(),
            "sending request"
        );

        let response = self
            .runtime
            .block_on(tokio::time::timeout(
                self.config.timeout,
                self.inner.request(hyper_request),
            ))
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_hyper_error)?;

        let (parts, incoming) = response.into_parts();
        debug!(status = parts.status.as_u16(), version = ?parts.version, "response received");

        let body = BlockingBody {
            body: incoming.map_err(io::Error::other).boxed_unsync(),
            chunk: Bytes::new(),
            runtime: Arc::clone(&self.runtime),
            timeout: self.config.timeout,
        };

        Ok(Response::new(
            parts.status.as_u16(),
            parts.headers,
            Body::from_reader(body),
        ))
    }
}

/// `Authorization: Basic` value for the credentials carried by `url`.
fn basic_credentials(url: &Url) -> Option<String> {
    if url.username().is_empty() && url.password().is_none() {
        return None;
    }

    let decode = |part: &str| percent_decode_str(part).decode_utf8_lossy().into_owned();
    let credentials = format!(
        "{}:{}",
        decode(url.username()),
        decode(url.password().unwrap_or_default())
    );
    Some(format!("Basic {}", STANDARD.encode(credentials)))
}

/// Response body read chunk by chunk from the connection.
struct BlockingBody {
    body: UnsyncBoxBody<Bytes, io::Error>,
    chunk: Bytes,
    runtime: Arc<Runtime>,
    timeout: Duration,
}

impl Read for BlockingBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.chunk.is_empty() {
            let frame = self
                .runtime
                .block_on(tokio::time::timeout(self.timeout, self.body.frame()))
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "body read timeout"))?;

            match frame {
                None => return Ok(0),
                Some(frame) => {
                    if let Ok(data) = frame?.into_data() {
                        self.chunk = data;
                    }
                }
            }
        }

        let mut remaining: &[u8] = &self.chunk;
        let read = remaining.read(buf)?;
        self.chunk.advance(read);
        Ok(read)
    }
}

/// Builder for [`HyperDoer`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use tongs::HyperDoer;
///
/// let doer = HyperDoer::builder()
///     .timeout(Duration::from_secs(5))
///     .user_agent("users-api/1.0")
///     .build()?;
/// # Ok::<(), tongs::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct HyperDoerBuilder {
    config: ClientConfigBuilder,
}

impl HyperDoerBuilder {
    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Set the default `User-Agent`.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config = self.config.user_agent(user_agent);
        self
    }

    /// Build the doer.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    pub fn build(self) -> Result<HyperDoer> {
        HyperDoer::with_config(self.config.build())
    }
}
