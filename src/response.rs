//! `Response` data model (spec §3) returned by the application handler.

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};

#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
    pub keep_alive: bool,
    /// Write this response over HTTP/1.1 with `Transfer-Encoding: chunked`
    /// instead of `Content-Length` (spec §4.3, §9). HTTP/2 responses are
    /// unaffected — H2 framing has no chunked coding of its own.
    pub chunked: bool,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Response {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            content_type: None,
            keep_alive: true,
            chunked: false,
        }
    }

    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut r = Self::new(status, body);
        r.content_type = Some(HeaderValue::from_static("text/plain"));
        r
    }

    pub fn with_header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Opts this response into chunked Transfer-Encoding on HTTP/1.1.
    pub fn with_chunked_encoding(mut self) -> Self {
        self.chunked = true;
        self
    }
}
