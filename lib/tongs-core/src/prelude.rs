//! Prelude module for convenient imports.
//!
//! ```
//! use tongs_core::prelude::*;
//! ```

pub use crate::{
    Api, Body, Doer, Error, ReadLimit, Request, RequestBuilder, Response, ResponseBuilder, Result,
    Serializer, doer_fn, parse_post_form,
};
