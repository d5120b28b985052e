use std::fmt;
use std::io::Read;

use bytes::Bytes;
use http::{Method, Uri};

use crate::headers::Headers;
use crate::query::QueryString;

/// Mutable abstract HTTP request handed to a request executor.
///
/// The executor mutates it in place: the authenticator adds `Authorization`,
/// the retry layer restores headers and query parameters between attempts and
/// writes the retry correlation headers. A request must not be shared across
/// concurrent `execute` calls.
pub struct Request {
    method: Method,
    uri: Uri,
    query: QueryString,
    headers: Headers,
    body: Option<RequestBody>,
}

impl Request {
    /// Builds a request for `uri`. Query parameters already present in the
    /// URI are split off into the [`QueryString`].
    pub fn new(method: Method, uri: Uri) -> Self {
        let mut query = QueryString::new();
        let uri = match uri.query() {
            Some(raw_query) => {
                query.extend_from_encoded(raw_query);
                strip_query(uri)
            }
            None => uri,
        };
        Self {
            method,
            uri,
            query,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn query(&self) -> &QueryString {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut QueryString {
        &mut self.query
    }

    pub fn set_query(&mut self, query: QueryString) {
        self.query = query;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    pub fn body_mut(&mut self) -> Option<&mut RequestBody> {
        self.body.as_mut()
    }

    pub fn set_body(&mut self, body: RequestBody) {
        self.body = Some(body);
    }

    /// The bytes to put on the wire for the next attempt. A buffered body
    /// stays behind so a later retry can rewind it; a one-shot reader is
    /// handed over and subsequent attempts send an empty body.
    pub(crate) fn wire_body(&mut self) -> WireBody {
        match self.body.take() {
            None => WireBody::Buffered(Bytes::new()),
            Some(RequestBody {
                inner: BodyInner::Reader(reader),
            }) => WireBody::Reader(reader),
            Some(RequestBody {
                inner: BodyInner::Buffered { bytes, position },
            }) => {
                let remaining = bytes.slice(position.min(bytes.len())..);
                let exhausted_position = bytes.len();
                self.body = Some(RequestBody {
                    inner: BodyInner::Buffered {
                        bytes,
                        position: exhausted_position,
                    },
                });
                WireBody::Buffered(remaining)
            }
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

fn strip_query(uri: Uri) -> Uri {
    let text = uri.to_string();
    match text.split_once('?') {
        Some((base, _)) => base.parse().unwrap_or(uri),
        None => uri,
    }
}

pub(crate) enum WireBody {
    Buffered(Bytes),
    Reader(Box<dyn Read + Send>),
}

/// Request body: either a buffered, rewindable byte slice or a one-shot
/// reader. Only buffered bodies can be replayed across retries.
pub struct RequestBody {
    inner: BodyInner,
}

enum BodyInner {
    Buffered { bytes: Bytes, position: usize },
    Reader(Box<dyn Read + Send>),
}

impl RequestBody {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: BodyInner::Buffered {
                bytes: bytes.into(),
                position: 0,
            },
        }
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: BodyInner::Reader(Box::new(reader)),
        }
    }

    pub fn is_rewindable(&self) -> bool {
        matches!(self.inner, BodyInner::Buffered { .. })
    }

    /// Resets a buffered body to its start; a no-op for one-shot readers.
    pub fn rewind(&mut self) {
        if let BodyInner::Buffered { position, .. } = &mut self.inner {
            *position = 0;
        }
    }
}

impl Read for RequestBody {
    fn read(&mut self, destination: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            BodyInner::Buffered { bytes, position } => {
                let remaining = &bytes[(*position).min(bytes.len())..];
                let read = remaining.len().min(destination.len());
                destination[..read].copy_from_slice(&remaining[..read]);
                *position += read;
                Ok(read)
            }
            BodyInner::Reader(reader) => reader.read(destination),
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            BodyInner::Buffered { bytes, position } => formatter
                .debug_struct("RequestBody")
                .field("buffered_len", &bytes.len())
                .field("position", position)
                .finish(),
            BodyInner::Reader(_) => formatter
                .debug_struct("RequestBody")
                .field("reader", &"..")
                .finish(),
        }
    }
}
