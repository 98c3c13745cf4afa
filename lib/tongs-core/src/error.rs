//! Error types for tongs.
//!
//! Every failure of a request/response cycle ends up as a single [`Error`]
//! returned by [`ResponseBuilder::resolve`](crate::ResponseBuilder::resolve).
//! Construction and execution failures are captured early and surfaced late,
//! resolution failures are returned as soon as they happen.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use derive_more::{Display, Error, From};

/// Caller-provided error, shared so it can be returned by many responses.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Diagnostic context
// ============================================================================

/// Method, URL and status of the response an error relates to.
///
/// Rendered as `request {METHOD} {URL} failed with status {CODE}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("request {method} {url} failed with status {status}")]
pub struct ResponseContext {
    /// Request method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Response status code.
    pub status: u16,
}

/// Body attached to an unhandled status error.
///
/// Displays as ` with b64 body <BASE64>` when non-empty, and as nothing
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyDump(Option<Bytes>);

impl BodyDump {
    /// Wraps drained body bytes; an empty body is recorded as absent.
    #[must_use]
    pub fn new(body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self((!body.is_empty()).then_some(body))
    }

    /// Raw body bytes, if any were read.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        self.0.as_ref()
    }
}

impl fmt::Display for BodyDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(body) => write!(f, " with b64 body {}", STANDARD.encode(body)),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for tongs operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The endpoint given to a request builder is not a valid absolute URL.
    #[display("unable to parse endpoint url {url:?}: {source}")]
    #[from(skip)]
    InvalidUrl {
        /// Endpoint as provided.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },

    /// A header name or value could not be encoded.
    #[display("invalid header {name:?}: {message}")]
    #[from(skip)]
    InvalidHeader {
        /// Header name as provided.
        name: String,
        /// Reason.
        message: String,
    },

    /// Both a raw body and an object to serialize were configured.
    #[display("body to serialize is set but raw body is already set")]
    #[from(skip)]
    BodyConflict,

    /// An object to serialize was configured without a serializer.
    #[display("body to serialize is set but body serializer is unset")]
    #[from(skip)]
    SerializerMissing,

    /// The serializer failed on the pending body.
    #[display("unable to serialize body: {source}")]
    #[from(skip)]
    Serialization {
        /// Serializer failure.
        source: Box<Error>,
    },

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// Form URL-encoded or query string serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// The method token or URL was rejected when building the request.
    #[display("unable to create request {method} {url}: {message}")]
    #[from(skip)]
    RequestConstruction {
        /// Method as provided.
        method: String,
        /// Resolved URL.
        url: String,
        /// Reason.
        message: String,
    },

    /// The request override hook failed.
    #[display("unable to override request: {source}")]
    #[from(skip)]
    Override {
        /// Hook failure.
        source: Box<Error>,
    },

    /// The [`Doer`](crate::Doer) failed to execute the request.
    #[display("unable to execute {method} {url} request: {source}")]
    #[from(skip)]
    Execution {
        /// Request method.
        method: String,
        /// Request URL.
        url: String,
        /// Executor failure.
        source: Box<Error>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// A body could not be read.
    #[display("unable to read body: {_0}")]
    #[from]
    BodyRead(std::io::Error),

    /// A body could not be parsed as URL-encoded form values.
    #[display("unable to parse form values from body: {_0}")]
    #[from(skip)]
    InvalidForm(#[error(not(source))] String),

    /// The declared content length is above the configured read limit.
    #[display("{context}: content length {content_length} is above read limit {limit}")]
    #[from(skip)]
    BodyTooLarge {
        /// Response context.
        context: ResponseContext,
        /// Declared content length.
        content_length: u64,
        /// Configured read limit.
        limit: u64,
    },

    /// No handler was registered for the response status.
    #[display("{context}: unhandled status{body}")]
    #[from(skip)]
    UnhandledStatus {
        /// Response context.
        context: ResponseContext,
        /// Drained response body.
        body: BodyDump,
    },

    /// A JSON response handler could not decode the body.
    #[display("{context}: unable to parse JSON response body at '{path}': {message}")]
    #[from(skip)]
    JsonDecode {
        /// Response context.
        context: ResponseContext,
        /// JSON path to the error.
        path: String,
        /// Error message.
        message: String,
        /// Decoding failure.
        source: serde_json::Error,
    },

    /// Caller-defined error, e.g. returned by
    /// [`ResponseBuilder::error_on_status`](crate::ResponseBuilder::error_on_status).
    #[display("{_0}")]
    #[from(skip)]
    Custom(#[error(not(source))] SharedError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a caller-defined error.
    #[must_use]
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(error))
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Look for a caller-defined error of type `E`, through any wrapping
    /// added by tongs.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Custom(inner) => inner.downcast_ref::<E>(),
            Self::Serialization { source }
            | Self::Override { source }
            | Self::Execution { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns `true` if this error is, or wraps, a caller-defined `E`.
    #[must_use]
    pub fn is<E>(&self) -> bool
    where
        E: std::error::Error + 'static,
    {
        self.downcast_ref::<E>().is_some()
    }

    /// Returns `true` if this is a timeout error, possibly wrapped by execution.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Execution { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a connection error, possibly wrapped by execution.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Execution { source, .. } => source.is_connection(),
            _ => false,
        }
    }

    /// Response context, for errors raised while resolving a response.
    #[must_use]
    pub const fn context(&self) -> Option<&ResponseContext> {
        match self {
            Self::BodyTooLarge { context, .. }
            | Self::UnhandledStatus { context, .. }
            | Self::JsonDecode { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Returns the HTTP status code if this error relates to a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.context().map(|context| context.status)
    }

    /// Returns the drained body of an unhandled status error.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        match self {
            Self::UnhandledStatus { body, .. } => body.as_bytes(),
            _ => None,
        }
    }

    /// Try to decode the body of an unhandled status error as JSON.
    ///
    /// Returns `None` if there is no body or this is not an unhandled status.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }
}
