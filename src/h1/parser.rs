//! Request line, header block, and body parsing (spec §4.3.1–§4.3.3).
//!
//! Parses directly off an incrementally-filled buffer, zero-copy in the
//! sense that no body bytes are ever allocated proportional to an untrusted
//! `Content-Length` before the limit check — the key invariant from spec
//! §4.3.3 and the quantified property in spec §8.

use crate::error::Http1Error;
use crate::request::{HttpVersion, Request};
use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};

const MAX_REQUEST_LINE: usize = 8 * 1024;

#[derive(Debug)]
pub enum ParseOutcome {
    NeedMore,
    Parsed { request: Request, consumed: usize },
}

enum BodyMode {
    None,
    ContentLength(u64),
    Chunked,
}

/// Attempts to parse one request off `buf`. Returns `NeedMore` if the
/// buffer does not yet contain a complete request; the caller reads more
/// and retries (spec §4.3.4).
pub fn parse_request(
    buf: &[u8],
    max_request_body_size: usize,
    is_https: bool,
    remote_addr: Option<std::net::SocketAddr>,
) -> Result<ParseOutcome, Http1Error> {
    let Some(header_end) = find_header_end(buf) else {
        if buf.len() > MAX_REQUEST_LINE + 64 * 1024 {
            return Err(Http1Error::BadRequest("header block too large"));
        }
        return Ok(ParseOutcome::NeedMore);
    };

    let header_block = &buf[..header_end];
    let (method, path, version, line_len) = parse_request_line(header_block)?;

    let mut headers = HeaderMap::new();
    let mut content_length: Option<u64> = None;
    let mut chunked = false;
    let mut connection_close = false;
    let mut has_host = false;

    let mut rest = &header_block[line_len..];
    loop {
        if rest.starts_with(b"\r\n") {
            break;
        }
        let Some(line_end) = find_crlf(rest) else {
            return Err(Http1Error::BadRequest("header line missing CRLF"));
        };
        let line = &rest[..line_end];
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(Http1Error::BadRequest("header missing colon"));
        };
        let name = &line[..colon];
        let mut value = &line[colon + 1..];
        while value.first() == Some(&b' ') || value.first() == Some(&b'\t') {
            value = &value[1..];
        }
        if value.iter().any(|&b| b == b'\r' || b == b'\n') {
            return Err(Http1Error::BadRequest("header injection attempt"));
        }

        let name_str = std::str::from_utf8(name).map_err(|_| Http1Error::BadRequest("bad header name"))?;
        let lower = name_str.to_ascii_lowercase();

        match lower.as_str() {
            "content-length" => {
                let v = std::str::from_utf8(value)
                    .ok()
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .ok_or(Http1Error::BadRequest("bad content-length"))?;
                if let Some(existing) = content_length {
                    if existing != v {
                        return Err(Http1Error::BadRequest("conflicting content-length"));
                    }
                } else {
                    content_length = Some(v);
                }
            }
            "transfer-encoding" => {
                if value.eq_ignore_ascii_case(b"chunked") {
                    chunked = true;
                }
            }
            "connection" => {
                if contains_token_ci(value, b"close") {
                    connection_close = true;
                }
            }
            "host" => has_host = true,
            _ => {}
        }

        let header_name =
            HeaderName::from_bytes(name).map_err(|_| Http1Error::BadRequest("invalid header name"))?;
        let header_value =
            HeaderValue::from_bytes(value).map_err(|_| Http1Error::BadRequest("invalid header value"))?;
        headers.append(header_name, header_value);

        rest = &rest[line_end + 2..];
    }

    if version == HttpVersion::Http11 && !has_host {
        return Err(Http1Error::BadRequest("missing Host header"));
    }

    if chunked && content_length.is_some() {
        // Mutually exclusive per spec §4.3.2: chunked wins, Content-Length ignored.
        content_length = None;
    }

    let body_mode = if chunked {
        BodyMode::Chunked
    } else if let Some(n) = content_length {
        BodyMode::ContentLength(n)
    } else {
        BodyMode::None
    };

    if let BodyMode::ContentLength(n) = body_mode {
        if n as usize > max_request_body_size {
            return Err(Http1Error::PayloadTooLarge);
        }
    }

    let body_start = header_end;
    let (body, body_consumed) = match body_mode {
        BodyMode::None => (Bytes::new(), 0),
        BodyMode::ContentLength(n) => {
            let n = n as usize;
            if buf.len() - body_start < n {
                return Ok(ParseOutcome::NeedMore);
            }
            (Bytes::copy_from_slice(&buf[body_start..body_start + n]), n)
        }
        BodyMode::Chunked => match parse_chunked(&buf[body_start..], max_request_body_size)? {
            Some((body, consumed)) => (body, consumed),
            None => return Ok(ParseOutcome::NeedMore),
        },
    };

    let keep_alive = if connection_close {
        false
    } else {
        version == HttpVersion::Http11
    };

    let request = Request {
        method,
        path,
        version,
        headers,
        content_length,
        keep_alive,
        is_https,
        remote_addr,
        items: Extensions::new(),
        principal: None,
        body,
    };

    Ok(ParseOutcome::Parsed {
        request,
        consumed: body_start + body_consumed,
    })
}

fn parse_request_line(buf: &[u8]) -> Result<(Method, String, HttpVersion, usize), Http1Error> {
    if buf.len() > MAX_REQUEST_LINE {
        return Err(Http1Error::BadRequest("request line too long"));
    }
    let line_end = find_crlf(buf).ok_or(Http1Error::BadRequest("missing request line CRLF"))?;
    if line_end > MAX_REQUEST_LINE {
        return Err(Http1Error::BadRequest("request line too long"));
    }
    let line = &buf[..line_end];
    let mut parts = line.splitn(3, |&b| b == b' ');
    let method = parts.next().ok_or(Http1Error::BadRequest("missing method"))?;
    let target = parts.next().ok_or(Http1Error::BadRequest("missing target"))?;
    let version = parts.next().ok_or(Http1Error::BadRequest("missing version"))?;

    if !method.iter().all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit()) || method.is_empty() {
        return Err(Http1Error::BadRequest("malformed method token"));
    }
    let method = Method::from_bytes(method).map_err(|_| Http1Error::BadRequest("unknown method"))?;

    let version = match version {
        b"HTTP/1.1" => HttpVersion::Http11,
        b"HTTP/1.0" => HttpVersion::Http10,
        _ => return Err(Http1Error::BadRequest("unsupported http version")),
    };

    let path = std::str::from_utf8(target)
        .map_err(|_| Http1Error::BadRequest("non-utf8 request target"))?
        .to_string();

    Ok((method, path, version, line_end + 2))
}

/// Parses `hex-size CRLF data CRLF` chunks until a size-0 chunk and empty
/// trailer section (spec §4.3.3), enforcing the body-size bound as data
/// accumulates rather than after the fact.
fn parse_chunked(buf: &[u8], max_request_body_size: usize) -> Result<Option<(Bytes, usize)>, Http1Error> {
    let mut pos = 0usize;
    let mut body = Vec::new();

    loop {
        let Some(line_end) = find_crlf(&buf[pos..]) else {
            return Ok(None);
        };
        let size_line = &buf[pos..pos + line_end];
        // Chunk extensions (";ext=val") are accepted and ignored.
        let size_str = size_line
            .split(|&b| b == b';')
            .next()
            .unwrap_or(size_line);
        let size_str = std::str::from_utf8(size_str).map_err(|_| Http1Error::BadRequest("bad chunk size"))?;
        let size = usize::from_str_radix(size_str.trim(), 16)
            .map_err(|_| Http1Error::BadRequest("bad chunk size"))?;
        pos += line_end + 2;

        if size == 0 {
            // Trailer section: zero or more header lines, then an empty line.
            loop {
                let Some(trailer_end) = find_crlf(&buf[pos..]) else {
                    return Ok(None);
                };
                if trailer_end == 0 {
                    pos += 2;
                    break;
                }
                pos += trailer_end + 2;
            }
            return Ok(Some((Bytes::from(body), pos)));
        }

        if buf.len() < pos + size + 2 {
            return Ok(None);
        }
        if body.len() + size > max_request_body_size {
            return Err(Http1Error::PayloadTooLarge);
        }
        body.extend_from_slice(&buf[pos..pos + size]);
        pos += size;
        if &buf[pos..pos + 2] != b"\r\n" {
            return Err(Http1Error::BadRequest("chunk missing trailing CRLF"));
        }
        pos += 2;
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn contains_token_ci(value: &[u8], token: &[u8]) -> bool {
    value
        .split(|&b| b == b',')
        .any(|part| part.trim_ascii().eq_ignore_ascii_case(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_get() {
        let buf = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        match parse_request(buf, 1024, false, None).unwrap() {
            ParseOutcome::Parsed { request, consumed } => {
                assert_eq!(request.method, Method::GET);
                assert_eq!(request.path, "/");
                assert!(request.keep_alive);
                assert_eq!(consumed, buf.len());
            }
            ParseOutcome::NeedMore => panic!("expected parsed"),
        }
    }

    #[test]
    fn rejects_oversize_content_length_before_reading_body() {
        let buf = b"POST /u HTTP/1.1\r\nHost: x\r\nContent-Length: 2000\r\n\r\n";
        let err = parse_request(buf, 1024, false, None).unwrap_err();
        assert!(matches!(err, Http1Error::PayloadTooLarge));
    }

    #[test]
    fn needs_more_for_incomplete_body() {
        let buf = b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhi";
        assert!(matches!(
            parse_request(buf, 1024, false, None).unwrap(),
            ParseOutcome::NeedMore
        ));
    }

    #[test]
    fn chunked_with_trailer_and_zero_length_chunks() {
        let buf = b"POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n0\r\nX-Trailer: v\r\n\r\n";
        match parse_request(buf, 1024, false, None).unwrap() {
            ParseOutcome::Parsed { request, .. } => assert_eq!(&request.body[..], b"Wiki"),
            ParseOutcome::NeedMore => panic!("expected parsed"),
        }
    }

    #[test]
    fn rejects_header_injection() {
        let buf = b"GET / HTTP/1.1\r\nHost: x\r\nX-Evil: a\rSet-Cookie: b\r\n\r\n";
        let err = parse_request(buf, 1024, false, None).unwrap_err();
        assert!(matches!(err, Http1Error::BadRequest(_)));
    }

    #[test]
    fn missing_host_is_bad_request() {
        let buf = b"GET / HTTP/1.1\r\n\r\n";
        let err = parse_request(buf, 1024, false, None).unwrap_err();
        assert!(matches!(err, Http1Error::BadRequest(_)));
    }
}
