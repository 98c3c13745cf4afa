//! Core types for the tongs fluent HTTP client.
//!
//! This crate provides the building blocks used by tongs:
//! - [`RequestBuilder`] and [`Request`] - fluent request construction
//! - [`ResponseBuilder`] and [`Response`] - status-based response dispatch
//! - [`Body`] - readable request and response bodies
//! - [`ReadLimit`] - how much of a response body handlers may read
//! - [`Doer`] - the request execution trait
//! - [`Api`] - shared defaults for every request to a server
//! - [`Error`] and [`Result`] - error handling
//! - [`parse_post_form`] - URL-encoded form decoding of request bodies
//!
//! A request goes through four steps: configure a [`RequestBuilder`],
//! execute it with a [`Doer`], register handlers on the returned
//! [`ResponseBuilder`], then resolve it.
//!
//! ```
//! use tongs_core::{RequestBuilder, Response, doer_fn};
//!
//! #[derive(serde::Serialize)]
//! struct UpdateEmail {
//!     email: String,
//! }
//!
//! let doer = doer_fn(|_| Ok(Response::new(204, http::HeaderMap::new(), "")));
//!
//! RequestBuilder::new("PUT", "https://api.example.com/users/{id}/email")
//!     .path_replacer("{id}", "42")
//!     .send_json(UpdateEmail { email: "alice@example.com".to_string() })
//!     .execute(&doer)
//!     .success_on_status(204)
//!     .resolve()
//!     .expect("email updated");
//! ```

mod api;
mod body;
mod codec;
mod doer;
mod error;
mod form;
mod limit;
pub mod prelude;
mod request;
mod response;

pub use api::{Api, ResponseHandler};
pub use body::Body;
pub use codec::{
    ContentType, Serializable, Serializer, from_json, to_form, to_json, to_query_string,
};
pub use doer::{Doer, DoerFn, doer_fn};
pub use error::{BodyDump, Error, ResponseContext, Result, SharedError};
pub use form::{FormValues, parse_form, parse_post_form};
pub use limit::{DEFAULT_READ_LIMIT, LimitExceeded, ReadLimit};
pub use request::{Request, RequestBuilder, RequestOverride, redacted_url};
pub use response::{Response, ResponseBuilder};

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, Method, StatusCode, header};
