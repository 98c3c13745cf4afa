//! Real HTTP round trips against a mock server.
//!
//! [`Server`] runs client code against a local [`wiremock`] server that
//! checks each incoming request with a [`RequestMatcher`] before answering.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use derive_more::{Display, Error, From};
use tongs::HyperDoer;
use tongs_core::{Doer, Request};
use url::Url;
use wiremock::{Mock, MockServer, Respond, ResponseTemplate, matchers};

use crate::{Mismatch, RequestMatcher};

/// Why a [`Server`] assertion failed.
#[derive(Debug, Display, Error, From)]
pub enum ServerError {
    /// The client code never reached the server.
    #[display("no request received")]
    #[from(skip)]
    NoRequest,

    /// A request received by the server did not match.
    #[display("request does not match: {_0}")]
    #[from(skip)]
    Mismatch(Mismatch),

    /// The client code failed.
    #[display("doer execution failed: {_0}")]
    #[from]
    Client(tongs_core::Error),

    /// The client code panicked.
    #[display("client code panicked: {_0}")]
    #[from]
    Panicked(tokio::task::JoinError),
}

type ClientFn = Arc<dyn Fn(Url, Arc<dyn Doer>) -> tongs_core::Result<()> + Send + Sync>;

/// Runs client code against a mock server, one server per assertion.
///
/// The client code gets the server base URL and a doer, and is run on a
/// blocking thread. Without [`with_doer`](Self::with_doer), a default
/// [`HyperDoer`] is used.
///
/// # Example
///
/// ```no_run
/// use tongs_core::RequestBuilder;
/// use tongs_test::{RequestMatcherBuilder, Server};
/// use wiremock::ResponseTemplate;
///
/// # async fn run() -> Result<(), tongs_test::ServerError> {
/// let server = Server::new(|base_url, doer| {
///     RequestBuilder::new("GET", &format!("{base_url}health"))
///         .execute(&doer)
///         .success_on_status(204)
///         .resolve()
/// });
///
/// server
///     .assert_request(
///         RequestMatcherBuilder::new().method("GET").url_path("/health"),
///         ResponseTemplate::new(204),
///     )
///     .await
/// # }
/// ```
#[derive(Clone)]
pub struct Server {
    client: ClientFn,
    doer: Option<Arc<dyn Doer>>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("custom_doer", &self.doer.is_some())
            .finish_non_exhaustive()
    }
}

impl Server {
    /// A server running `client` for each assertion.
    pub fn new<F>(client: F) -> Self
    where
        F: Fn(Url, Arc<dyn Doer>) -> tongs_core::Result<()> + Send + Sync + 'static,
    {
        Self {
            client: Arc::new(client),
            doer: None,
        }
    }

    /// Hand `doer` to the client code instead of a default [`HyperDoer`].
    #[must_use]
    pub fn with_doer(mut self, doer: Arc<dyn Doer>) -> Self {
        self.doer = Some(doer);
        self
    }

    /// Start a server, run the client code against it, and check what the
    /// server received.
    ///
    /// Matching requests are answered with `response`, others with a 500
    /// carrying the mismatch.
    ///
    /// # Errors
    ///
    /// In order of precedence:
    /// - [`ServerError::Mismatch`] for the first received request that did
    ///   not match,
    /// - [`ServerError::Client`] or [`ServerError::Panicked`] if the client
    ///   code failed,
    /// - [`ServerError::NoRequest`] if nothing reached the server.
    pub async fn assert_request<M>(
        &self,
        matcher: M,
        response: ResponseTemplate,
    ) -> Result<(), ServerError>
    where
        M: RequestMatcher + 'static,
    {
        let mock_server = MockServer::start().await;
        let received = Arc::new(Mutex::new(Vec::new()));

        Mock::given(matchers::any())
            .respond_with(Expectation {
                matcher: Box::new(matcher),
                response,
                received: Arc::clone(&received),
            })
            .mount(&mock_server)
            .await;

        let uri = mock_server.uri();
        let base_url = Url::parse(&uri).map_err(|source| tongs_core::Error::InvalidUrl {
            url: uri.clone(),
            source,
        })?;
        tracing::debug!(%base_url, "mock server started");

        let client = Arc::clone(&self.client);
        let doer = self.doer.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let doer: Arc<dyn Doer> = match doer {
                Some(doer) => doer,
                None => Arc::new(HyperDoer::new()?),
            };
            client(base_url, doer)
        })
        .await;

        let received =
            std::mem::take(&mut *received.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(mismatch) = received.into_iter().find_map(Result::err) {
            return Err(ServerError::Mismatch(mismatch));
        }
        outcome??;

        let requests = mock_server.received_requests().await.unwrap_or_default();
        if requests.is_empty() {
            return Err(ServerError::NoRequest);
        }

        Ok(())
    }
}

struct Expectation {
    matcher: Box<dyn RequestMatcher>,
    response: ResponseTemplate,
    received: Arc<Mutex<Vec<Result<(), Mismatch>>>>,
}

impl Respond for Expectation {
    fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
        let mut request = to_request(request);
        let outcome = self.matcher.match_request(&mut request);

        let template = match &outcome {
            Ok(()) => self.response.clone(),
            Err(mismatch) => ResponseTemplate::new(500)
                .set_body_string(format!("request does not match: {mismatch}")),
        };

        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
        template
    }
}

fn to_request(received: &wiremock::Request) -> Request {
    let mut request = Request::new(received.method.clone(), received.url.clone())
        .with_body(received.body.clone());
    *request.headers_mut() = received.headers.clone();
    request
}
