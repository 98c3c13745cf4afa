//! Test doubles for code built on the tongs HTTP builders.
//!
//! - [`DoerStub`] answers requests with canned responses,
//! - [`DoerSpy`] records what goes through another doer,
//! - [`RequestMatcherBuilder`] asserts the shape of a request,
//! - [`Server`] runs client code against a real local HTTP server.
//!
//! # Example
//!
//! ```
//! use tongs_core::{RequestBuilder, Response};
//! use tongs_test::{DoerStub, DoerStubCall, RequestMatcherBuilder};
//!
//! fn user_name(doer: &dyn tongs_core::Doer) -> tongs_core::Result<String> {
//!     let mut user = serde_json::Value::Null;
//!     RequestBuilder::new("GET", "https://api.example.com/users/1")
//!         .execute(doer)
//!         .receive_json(200, &mut user)
//!         .resolve()?;
//!     Ok(user["name"].as_str().unwrap_or_default().to_string())
//! }
//!
//! let doer = DoerStub::new([DoerStubCall::respond(Response::new(
//!     200,
//!     http::HeaderMap::new(),
//!     r#"{"name":"alice"}"#,
//! ))
//! .when(RequestMatcherBuilder::new().method("GET").url_path("/users/1"))]);
//!
//! assert_eq!(user_name(&doer).expect("user"), "alice");
//! ```

mod matcher;
mod server;
mod spy;
mod stub;

pub use matcher::{Mismatch, RequestMatcher, RequestMatcherBuilder};
pub use server::{Server, ServerError};
pub use spy::{DoerSpy, DoerSpyRecord, SpiedResponse};
pub use stub::{DoerStub, DoerStubCall, StubError};

// Re-export wiremock responses used by `Server`
pub use wiremock::ResponseTemplate;
