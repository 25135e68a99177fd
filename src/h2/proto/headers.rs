//! Pseudo-header parsing/validation and `Request`/`Response` <-> HPACK
//! header-list conversion (spec §4.5.2 HEADERS, §3).

use crate::error::{H2Error, Reason};
use crate::hpack::Header;
use crate::request::{HttpVersion, Request};
use crate::response::Response;
use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};

const CONNECTION_SPECIFIC: &[&str] = &["connection", "transfer-encoding", "keep-alive", "proxy-connection", "upgrade"];

fn conn_error() -> H2Error {
    H2Error::Stream(Reason::ProtocolError)
}

/// The request-line pseudo-headers plus regular headers, validated but not
/// yet carrying a body — decoded as soon as a stream's header block
/// completes (END_HEADERS), independent of when END_STREAM arrives
/// (spec §4.5.2 HEADERS validation).
#[derive(Debug)]
pub struct PartialRequest {
    pub method: Method,
    pub path: String,
    pub is_https: bool,
    pub headers: HeaderMap,
}

pub fn parse_request_headers(headers: Vec<Header>) -> Result<PartialRequest, H2Error> {
    let mut method: Option<Method> = None;
    let mut scheme: Option<String> = None;
    let mut authority: Option<String> = None;
    let mut path: Option<String> = None;
    let mut map = HeaderMap::new();
    let mut seen_regular = false;

    for (name, value) in headers {
        if let Some(pseudo) = name.strip_prefix(':') {
            if seen_regular {
                return Err(conn_error()); // pseudo-headers must precede regular headers
            }
            match pseudo {
                "method" => {
                    method = Some(Method::from_bytes(value.as_bytes()).map_err(|_| conn_error())?);
                }
                "scheme" => scheme = Some(value),
                "authority" => authority = Some(value),
                "path" => path = Some(value),
                _ => return Err(conn_error()),
            }
            continue;
        }
        seen_regular = true;
        let lower = name.to_ascii_lowercase();
        if CONNECTION_SPECIFIC.contains(&lower.as_str()) {
            return Err(conn_error());
        }
        let header_name = HeaderName::from_bytes(lower.as_bytes()).map_err(|_| conn_error())?;
        let header_value = HeaderValue::from_str(&value).map_err(|_| conn_error())?;
        map.append(header_name, header_value);
    }

    let method = method.ok_or_else(conn_error)?;
    let scheme = scheme.ok_or_else(conn_error)?;
    let path = path.ok_or_else(conn_error)?;

    if let Some(authority) = &authority {
        if !map.contains_key(http::header::HOST) {
            if let Ok(hv) = HeaderValue::from_str(authority) {
                map.insert(http::header::HOST, hv);
            }
        }
    }

    Ok(PartialRequest { method, path, is_https: scheme == "https", headers: map })
}

/// Trailing headers (a second header block, arriving after the body) are
/// handed to the application through `Request::items` rather than a
/// dedicated field, since the vast majority of requests never carry any
/// (spec §9: request trailers are parsed and attached, not dropped).
#[derive(Debug, Clone, Default)]
pub struct Trailers(pub HeaderMap);

/// Validates and decodes a second, trailing header block. Pseudo-headers
/// are illegal in trailers (RFC 7540 §8.1); connection-specific headers
/// are rejected the same way they are in the leading block.
pub fn parse_trailers(headers: Vec<Header>) -> Result<HeaderMap, H2Error> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if name.starts_with(':') {
            return Err(conn_error());
        }
        let lower = name.to_ascii_lowercase();
        if CONNECTION_SPECIFIC.contains(&lower.as_str()) {
            return Err(conn_error());
        }
        let header_name = HeaderName::from_bytes(lower.as_bytes()).map_err(|_| conn_error())?;
        let header_value = HeaderValue::from_str(&value).map_err(|_| conn_error())?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

/// Attaches the fully-assembled body once END_STREAM arrives, producing
/// the `Request` handed to the dispatch boundary.
pub fn finish_request(
    partial: PartialRequest,
    body: Bytes,
    is_https: bool,
    remote_addr: Option<std::net::SocketAddr>,
    trailers: Option<HeaderMap>,
) -> Request {
    let content_length = partial
        .headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());

    let mut items = Extensions::new();
    if let Some(trailers) = trailers {
        items.insert(Trailers(trailers));
    }

    Request {
        method: partial.method,
        path: partial.path,
        version: HttpVersion::Http2,
        headers: partial.headers,
        body,
        content_length,
        keep_alive: true,
        is_https: is_https || partial.is_https,
        remote_addr,
        items,
        principal: None,
    }
}

/// Builds the header list for a response's HEADERS frame: `:status` first,
/// then regular headers in original order (spec §4.5.3 step 2).
pub fn response_to_headers(response: &Response) -> Vec<Header> {
    let mut out = Vec::with_capacity(2 + response.headers.len());
    out.push((":status".to_string(), response.status.as_u16().to_string()));
    if let Some(ct) = &response.content_type {
        if let Ok(v) = ct.to_str() {
            out.push(("content-type".to_string(), v.to_string()));
        }
    }
    for (name, value) in response.headers.iter() {
        let lower = name.as_str().to_ascii_lowercase();
        if CONNECTION_SPECIFIC.contains(&lower.as_str()) {
            continue;
        }
        if let Ok(v) = value.to_str() {
            out.push((lower, v.to_string()));
        }
    }
    out.push(("content-length".to_string(), response.body.len().to_string()));
    out
}

/// Builds the header list for a server-push request (spec §4.5.4).
pub fn push_request_headers(method: &Method, scheme: &str, authority: &str, path: &str) -> Vec<Header> {
    vec![
        (":method".to_string(), method.as_str().to_string()),
        (":scheme".to_string(), scheme.to_string()),
        (":authority".to_string(), authority.to_string()),
        (":path".to_string(), path.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(name: &str, value: &str) -> Header {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn parses_minimal_get() {
        let parsed = parse_request_headers(vec![
            h(":method", "GET"),
            h(":scheme", "https"),
            h(":path", "/widgets"),
            h(":authority", "example.com"),
        ])
        .unwrap();
        assert_eq!(parsed.method, Method::GET);
        assert_eq!(parsed.path, "/widgets");
        assert!(parsed.is_https);
        assert_eq!(parsed.headers.get(http::header::HOST).unwrap(), "example.com");
    }

    #[test]
    fn explicit_host_header_is_not_overwritten_by_authority() {
        let parsed = parse_request_headers(vec![
            h(":method", "GET"),
            h(":scheme", "http"),
            h(":path", "/"),
            h(":authority", "authority.example"),
            h("host", "explicit.example"),
        ])
        .unwrap();
        assert_eq!(parsed.headers.get(http::header::HOST).unwrap(), "explicit.example");
    }

    #[test]
    fn missing_pseudo_header_is_rejected() {
        let err = parse_request_headers(vec![h(":method", "GET"), h(":scheme", "http")]).unwrap_err();
        assert!(matches!(err, H2Error::Stream(Reason::ProtocolError)));
    }

    #[test]
    fn pseudo_header_after_regular_header_is_rejected() {
        let err = parse_request_headers(vec![
            h(":method", "GET"),
            h(":scheme", "http"),
            h(":path", "/"),
            h("x-custom", "1"),
            h(":authority", "example.com"),
        ])
        .unwrap_err();
        assert!(matches!(err, H2Error::Stream(Reason::ProtocolError)));
    }

    #[test]
    fn connection_specific_header_is_rejected() {
        let err = parse_request_headers(vec![
            h(":method", "GET"),
            h(":scheme", "http"),
            h(":path", "/"),
            h("connection", "keep-alive"),
        ])
        .unwrap_err();
        assert!(matches!(err, H2Error::Stream(Reason::ProtocolError)));
    }

    #[test]
    fn trailers_reject_pseudo_headers() {
        let err = parse_trailers(vec![h(":status", "200")]).unwrap_err();
        assert!(matches!(err, H2Error::Stream(Reason::ProtocolError)));
    }

    #[test]
    fn trailers_parse_into_a_header_map() {
        let map = parse_trailers(vec![h("x-checksum", "abc123")]).unwrap();
        assert_eq!(map.get("x-checksum").unwrap(), "abc123");
    }

    #[test]
    fn response_headers_carry_status_and_content_length_and_drop_connection_specific() {
        let mut response = Response::new(http::StatusCode::OK, Bytes::from_static(b"hi"));
        response.headers.insert(http::header::CONNECTION, HeaderValue::from_static("close"));
        response.headers.insert(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc"),
        );
        let list = response_to_headers(&response);
        assert_eq!(list[0], (":status".to_string(), "200".to_string()));
        assert!(list.iter().any(|(n, v)| n == "x-request-id" && v == "abc"));
        assert!(!list.iter().any(|(n, _)| n == "connection"));
        assert_eq!(list.last().unwrap(), &("content-length".to_string(), "2".to_string()));
    }
}
