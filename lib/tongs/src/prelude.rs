//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob
//! importing:
//!
//! ```
//! use tongs::prelude::*;
//! ```

pub use crate::middleware::DoerExt;
pub use crate::{
    Api, Body, ClientConfig, Doer, Error, HyperDoer, ReadLimit, Request, RequestBuilder, Response,
    ResponseBuilder, Result, Serializer, StatusCode, doer_fn, header, parse_post_form,
};
pub use serde::{Deserialize, Serialize};
