use std::io::Cursor;

use bytes::Bytes;
use http::StatusCode;

use crate::headers::Headers;

/// Fully buffered HTTP response.
///
/// The body is owned bytes: it can be read any number of times through
/// [`Response::body_reader`] and is never backed by a live network stream.
/// `content_length` is the length the transport reported before any content
/// decoding, or `-1` when it was unknown.
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    media_type: Option<String>,
    headers: Headers,
    body: Bytes,
    content_length: i64,
}

impl Response {
    pub fn new(status: StatusCode, headers: Headers, body: Bytes, content_length: i64) -> Self {
        let media_type = headers.content_type().map(ToOwned::to_owned);
        Self {
            status,
            media_type,
            headers,
            body,
            content_length,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// A fresh reader over the buffered body.
    pub fn body_reader(&self) -> impl std::io::Read + '_ {
        Cursor::new(self.body.as_ref())
    }

    pub fn content_length(&self) -> i64 {
        self.content_length
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use http::header::{CONTENT_TYPE, HeaderValue};

    use super::*;

    #[test]
    fn media_type_comes_from_content_type() {
        let mut headers = Headers::new();
        headers.set(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        let response = Response::new(StatusCode::OK, headers, Bytes::from_static(b"{}"), 2);
        assert_eq!(response.media_type(), Some("application/json; charset=utf-8"));
    }

    #[test]
    fn body_is_readable_twice() {
        let response = Response::new(
            StatusCode::OK,
            Headers::new(),
            Bytes::from_static(b"hello"),
            5,
        );
        let mut first = String::new();
        response
            .body_reader()
            .read_to_string(&mut first)
            .expect("read buffered body");
        let mut second = String::new();
        response
            .body_reader()
            .read_to_string(&mut second)
            .expect("read buffered body again");
        assert_eq!(first, "hello");
        assert_eq!(first, second);
    }
}
