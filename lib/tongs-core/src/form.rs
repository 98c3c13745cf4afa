//! URL-encoded form decoding for request bodies.

use std::collections::BTreeMap;

use http::header::CONTENT_TYPE;

use crate::{ContentType, Error, Request, Result};

/// Multi-valued form or query values, keyed by name.
pub type FormValues = BTreeMap<String, Vec<String>>;

/// Parses the request body as URL-encoded form values and stores them on the
/// request.
///
/// Calling it again returns the stored values without touching the body.
///
/// For `POST`, `PUT` and `PATCH`, the body is parsed only when the
/// `Content-Type` is `application/x-www-form-urlencoded`, otherwise no values
/// are stored. Any other method has its body parsed whatever its content
/// type.
///
/// The body is buffered, it can still be read afterwards.
///
/// # Errors
///
/// - [`Error::BodyRead`] if the body cannot be read,
/// - [`Error::InvalidForm`] if the body is not valid URL-encoded text.
///
/// # Example
///
/// ```
/// use tongs_core::{RequestBuilder, parse_post_form};
///
/// let mut request = RequestBuilder::new("DELETE", "https://api.example.com/sessions")
///     .send("token=abc&reason=logout")
///     .request()
///     .expect("request");
///
/// let form = parse_post_form(&mut request).expect("form");
/// assert_eq!(form["token"], ["abc"]);
/// ```
pub fn parse_post_form(request: &mut Request) -> Result<&FormValues> {
    if request.form.is_none() {
        let values = read_form(request)?;
        request.form = Some(values);
    }

    Ok(request.form.get_or_insert_with(FormValues::new))
}

fn read_form(request: &mut Request) -> Result<FormValues> {
    let has_body_form = matches!(
        *request.method(),
        http::Method::POST | http::Method::PUT | http::Method::PATCH
    );
    if has_body_form
        && !request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| ContentType::FormUrlEncoded.matches(value))
    {
        return Ok(FormValues::new());
    }

    let bytes = request.body_mut().buffer()?;
    let text = std::str::from_utf8(bytes).map_err(|e| Error::InvalidForm(e.to_string()))?;
    parse_form(text)
}

/// Parses URL-encoded `text` into form values.
///
/// # Errors
///
/// Returns [`Error::InvalidForm`] on a malformed percent escape.
pub fn parse_form(text: &str) -> Result<FormValues> {
    if let Some(escape) = invalid_escape(text) {
        return Err(Error::InvalidForm(format!("invalid URL escape {escape:?}")));
    }

    let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(text)
        .map_err(|e| Error::InvalidForm(e.to_string()))?;

    let mut values = FormValues::new();
    for (key, value) in pairs {
        values.entry(key).or_default().push(value);
    }
    Ok(values)
}

fn invalid_escape(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'%')
        .find(|(index, _)| {
            !bytes
                .get(index + 1..index + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
        })
        .map(|(index, _)| text.get(index..(index + 3).min(text.len())).unwrap_or("%"))
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use assert2::{check, let_assert};

    use super::*;
    use crate::{Body, RequestBuilder};

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("connection reset"))
        }
    }

    fn request(method: &str, content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = RequestBuilder::new(method, "https://api.example.com/form").send(body);
        if let Some(content_type) = content_type {
            builder = builder.set_header("Content-Type", content_type);
        }
        builder.request().expect("request")
    }

    #[test]
    fn post_form_with_form_content_type() {
        let mut request = request(
            "POST",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "name=alice&tag=a&tag=b",
        );

        let form = parse_post_form(&mut request).expect("form");
        check!(form["name"] == ["alice"]);
        check!(form["tag"] == ["a", "b"]);
    }

    #[test]
    fn post_with_other_content_type_is_empty() {
        let mut request = request("POST", Some("application/json"), r#"{"name":"alice"}"#);

        let form = parse_post_form(&mut request).expect("form");
        check!(form.is_empty());
    }

    #[test]
    fn delete_body_is_parsed_regardless_of_content_type() {
        let mut request = request("DELETE", None, "id=1&id=2");

        let form = parse_post_form(&mut request).expect("form");
        check!(form["id"] == ["1", "2"]);
    }

    #[test]
    fn parsing_is_idempotent_and_keeps_body() {
        let mut request = request(
            "PUT",
            Some("application/x-www-form-urlencoded"),
            "name=alice",
        );

        let first = parse_post_form(&mut request).expect("form").clone();
        let second = parse_post_form(&mut request).expect("form").clone();
        check!(first == second);
        check!(request.form() == Some(&first));

        let mut body = String::new();
        request.body_mut().read_to_string(&mut body).expect("read");
        check!(body == "name=alice");
    }

    #[test]
    fn decoded_values() {
        let form = parse_form("q=rust+lang&emoji=%F0%9F%A6%80").expect("form");
        check!(form["q"] == ["rust lang"]);
        check!(form["emoji"] == ["🦀"]);
    }

    #[test]
    fn invalid_escape_is_rejected() {
        let result = parse_form("name=%zz");
        let_assert!(Err(err @ Error::InvalidForm(_)) = result);
        check!(
            err.to_string()
                == r#"unable to parse form values from body: invalid URL escape "%zz""#
        );

        let_assert!(Err(Error::InvalidForm(_)) = parse_form("name=%4"));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut request = Request::new(
            http::Method::DELETE,
            url::Url::parse("https://api.example.com").expect("url"),
        )
        .with_body(vec![0xff, 0xfe]);

        let_assert!(Err(Error::InvalidForm(_)) = parse_post_form(&mut request));
    }

    #[test]
    fn read_failure_is_reported() {
        let mut request = Request::new(
            http::Method::DELETE,
            url::Url::parse("https://api.example.com").expect("url"),
        )
        .with_body(Body::from_reader(FailingReader));

        let_assert!(Err(Error::BodyRead(_)) = parse_post_form(&mut request));
        check!(request.form().is_none());
    }
}
