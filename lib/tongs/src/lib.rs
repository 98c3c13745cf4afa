//! Fluent HTTP client for Rust.
//!
//! Build a request, execute it with a [`Doer`], register a handler per
//! expected status, resolve. Every status without handler is an error.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tongs::prelude::*;
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let api = Api::parse(Arc::new(HyperDoer::new()?), "https://api.example.com")?;
//!
//! let mut user = User::default();
//! api.execute(api.get("/users/{id}").path_replacer("{id}", "42"))
//!     .receive_json(200, &mut user)
//!     .resolve()?;
//!
//! println!("{} is user {}", user.name, user.id);
//! # Ok::<(), tongs::Error>(())
//! ```
//!
//! The [`middleware`] module wraps doers with logging and base64 dumps.

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;

pub use client::{HyperDoer, HyperDoerBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};

// Re-export core types
pub use tongs_core::{
    Api, Body, BodyDump, ContentType, DEFAULT_READ_LIMIT, Doer, DoerFn, Error, FormValues,
    LimitExceeded, ReadLimit, Request, RequestBuilder, RequestOverride, Response, ResponseBuilder,
    ResponseContext, ResponseHandler, Result, Serializable, Serializer, SharedError, doer_fn,
    from_json, parse_form, parse_post_form, redacted_url, to_form, to_json, to_query_string,
};

// Re-export http types for status codes and headers
pub use tongs_core::{HeaderMap, Method, StatusCode, header};

// Re-export crates used in public signatures
pub use url;
