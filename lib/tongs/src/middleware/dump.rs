//! Base64 dump of raw requests and responses.
//!
//! Useful to capture exchanges in logs without worrying about binary content
//! or line breaks.

use std::fmt::Write as _;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;

use crate::{Doer, Request, Response, Result};

type DumpFn = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Doer handing a base64 dump of each exchange to a callback.
///
/// Both the request and the response are dumped in HTTP/1.1 wire format,
/// bodies included. Bodies are buffered to be dumped, they stay readable.
/// The response dump is empty when no response was obtained.
///
/// # Example
///
/// ```
/// use tongs::middleware::DumpDoer;
/// use tongs::{RequestBuilder, Response, doer_fn};
///
/// let doer = DumpDoer::new(
///     doer_fn(|_| Ok(Response::new(204, http::HeaderMap::new(), ""))),
///     |request, response| tracing::debug!(request, response, "exchange"),
/// );
///
/// RequestBuilder::new("GET", "https://api.example.com/health")
///     .execute(&doer)
///     .success_on_status(204)
///     .resolve()
///     .expect("healthy");
/// ```
#[derive(Clone)]
pub struct DumpDoer<D> {
    inner: D,
    dump: DumpFn,
}

impl<D: std::fmt::Debug> std::fmt::Debug for DumpDoer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpDoer")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<D> DumpDoer<D> {
    /// Wrap `inner`, calling `dump(request_b64, response_b64)` after each
    /// execution.
    pub fn new<F>(inner: D, dump: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        Self {
            inner,
            dump: Arc::new(dump),
        }
    }
}

impl<D: Doer> Doer for DumpDoer<D> {
    fn execute(&self, mut request: Request) -> Result<Response> {
        let request_dump = STANDARD.encode(dump_request(&mut request));

        let mut result = self.inner.execute(request);
        let response_dump = match &mut result {
            Ok(response) => STANDARD.encode(dump_response(response)),
            Err(_) => String::new(),
        };

        (self.dump)(&request_dump, &response_dump);
        result
    }
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        let _ = write!(out, "{}: {value}\r\n", canonical_name(name.as_str()));
    }
}

/// `content-type` as `Content-Type`.
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn dump_request(request: &mut Request) -> Vec<u8> {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut head = format!("{} {target} HTTP/1.1\r\n", request.method());
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => {
                let _ = write!(head, "Host: {host}:{port}\r\n");
            }
            None => {
                let _ = write!(head, "Host: {host}\r\n");
            }
        }
    }
    write_headers(&mut head, request.headers());

    match request.body_mut().buffer() {
        Ok(body) => {
            head.push_str("\r\n");
            let mut out = head.into_bytes();
            out.extend_from_slice(body);
            out
        }
        Err(err) => format!("unable to dump request: {err}").into_bytes(),
    }
}

fn dump_response(response: &mut Response) -> Vec<u8> {
    let status = response.status();
    let reason = http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default();

    let mut head = format!("HTTP/1.1 {status} {reason}\r\n");
    write_headers(&mut head, response.headers());

    match response.body_mut().buffer() {
        Ok(body) => {
            head.push_str("\r\n");
            let mut out = head.into_bytes();
            out.extend_from_slice(body);
            out
        }
        Err(err) => format!("unable to dump response: {err}").into_bytes(),
    }
}
