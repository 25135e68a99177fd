//! `Request` data model (spec §3).

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
    Http2,
}

/// A fully parsed, read-only request handed to the application handler.
///
/// Header names are lowercase when the request arrived over HTTP/2 and
/// original-case when it arrived over HTTP/1.1; `HeaderMap` lookups are
/// case-insensitive either way, per spec §3.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub version: HttpVersion,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub content_length: Option<u64>,
    pub keep_alive: bool,
    pub is_https: bool,
    pub remote_addr: Option<SocketAddr>,
    pub items: Extensions,
    pub principal: Option<String>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}
