//! Request and response bodies.
//!
//! A [`Body`] is either bytes already in memory or a boxed reader. Reading
//! consumes it, dropping it closes whatever stream backs it.

use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, Bytes};

enum Kind {
    Bytes(Bytes),
    Reader(Box<dyn Read + Send>),
}

/// HTTP message body.
pub struct Body {
    kind: Kind,
}

impl Body {
    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    /// A body streamed from a reader.
    ///
    /// The reader is dropped with the body.
    #[must_use]
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            kind: Kind::Reader(Box::new(reader)),
        }
    }

    /// Remaining bytes, if the body is held in memory.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.kind {
            Kind::Bytes(bytes) => Some(bytes),
            Kind::Reader(_) => None,
        }
    }

    /// Cap further reads to `limit` bytes.
    pub fn limit(&mut self, limit: u64) {
        match &mut self.kind {
            Kind::Bytes(bytes) => {
                let limit = usize::try_from(limit).unwrap_or(usize::MAX);
                bytes.truncate(limit);
            }
            Kind::Reader(reader) => {
                let inner = std::mem::replace(reader, Box::new(io::empty()));
                *reader = Box::new(inner.take(limit));
            }
        }
    }

    /// Read the whole remaining body into memory and keep it there, so it can
    /// be inspected without being consumed.
    pub fn buffer(&mut self) -> io::Result<&Bytes> {
        if let Kind::Reader(reader) = &mut self.kind {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            self.kind = Kind::Bytes(Bytes::from(buffer));
        }

        match &self.kind {
            Kind::Bytes(bytes) => Ok(bytes),
            Kind::Reader(_) => Err(io::Error::other("body was not buffered")),
        }
    }

    /// Read the whole remaining body, leaving it empty.
    pub fn read_all(&mut self) -> io::Result<Bytes> {
        let bytes = self.buffer()?.clone();
        self.kind = Kind::Bytes(Bytes::new());
        Ok(bytes)
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.kind {
            Kind::Bytes(bytes) => {
                let mut remaining: &[u8] = bytes;
                let read = remaining.read(buf)?;
                bytes.advance(read);
                Ok(read)
            }
            Kind::Reader(reader) => reader.read(buf),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Bytes(bytes) => f.debug_tuple("Body").field(bytes).finish(),
            Kind::Reader(_) => f.debug_tuple("Body").field(&"<reader>").finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            kind: Kind::Bytes(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn read_to_string(body: &mut Body) -> String {
        let mut out = String::new();
        body.read_to_string(&mut out).expect("read");
        out
    }

    #[test]
    fn bytes_body_reads_and_consumes() {
        let mut body = Body::from("hello");
        assert_eq!(read_to_string(&mut body), "hello");
        assert_eq!(read_to_string(&mut body), "");
    }

    #[test]
    fn limit_caps_in_memory_body() {
        let mut body = Body::from("hello world!");
        body.limit(5);
        assert_eq!(read_to_string(&mut body), "hello");

        let mut body = Body::from("hi");
        body.limit(10);
        assert_eq!(read_to_string(&mut body), "hi");
    }

    #[test]
    fn limit_caps_reader_body() {
        let mut body = Body::from_reader(Cursor::new(b"hello world!".to_vec()));
        body.limit(5);
        assert_eq!(read_to_string(&mut body), "hello");
    }

    #[test]
    fn buffer_keeps_content_readable() {
        let mut body = Body::from_reader(Cursor::new(b"payload".to_vec()));
        assert!(body.as_bytes().is_none());

        let buffered = body.buffer().expect("buffer").clone();
        assert_eq!(buffered, Bytes::from("payload"));
        assert_eq!(body.as_bytes(), Some(&Bytes::from("payload")));
        assert_eq!(read_to_string(&mut body), "payload");
    }

    #[test]
    fn read_all_empties_body() {
        let mut body = Body::from_reader(Cursor::new(b"payload".to_vec()));
        assert_eq!(body.read_all().expect("read"), Bytes::from("payload"));
        assert_eq!(body.as_bytes(), Some(&Bytes::new()));
    }

    #[test]
    fn debug_hides_reader() {
        let body = Body::from_reader(io::empty());
        assert_eq!(format!("{body:?}"), r#"Body("<reader>")"#);
    }
}
