//! HTTP/1.1 response writing: CRLF-framed status line, headers, and body
//! with `Content-Length` or chunked transfer coding (spec §4.6 step 3, §9
//! open question on response-side chunked encoding).

use crate::error::IoError;
use crate::io::Stream;
use crate::response::Response;
use std::time::Duration;

/// Builds the wire bytes for one response. Ordinary responses use
/// `Content-Length`; a handler that built its `Response` with
/// [`Response::with_chunked_encoding`] gets `Transfer-Encoding: chunked`
/// instead (spec §4.3, §9) — the body is already fully materialized here,
/// so "chunked" is written out as a single data chunk followed by the
/// terminating zero-length chunk rather than incrementally, but the wire
/// framing a client observes is identical to a truly streamed chunked
/// response.
fn encode_response(response: &Response) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + response.body.len());

    let reason = response.status.canonical_reason().unwrap_or("");
    out.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", response.status.as_u16(), reason).as_bytes());

    if let Some(ct) = &response.content_type {
        out.extend_from_slice(b"Content-Type: ");
        out.extend_from_slice(ct.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    for (name, value) in response.headers.iter() {
        if name.as_str().eq_ignore_ascii_case("content-length")
            || name.as_str().eq_ignore_ascii_case("connection")
            || name.as_str().eq_ignore_ascii_case("transfer-encoding")
        {
            continue;
        }
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    if response.chunked {
        out.extend_from_slice(b"Transfer-Encoding: chunked\r\n");
    } else {
        out.extend_from_slice(format!("Content-Length: {}\r\n", response.body.len()).as_bytes());
    }
    out.extend_from_slice(if response.keep_alive {
        b"Connection: keep-alive\r\n"
    } else {
        b"Connection: close\r\n"
    });
    out.extend_from_slice(b"\r\n");

    if response.chunked {
        if !response.body.is_empty() {
            out.extend_from_slice(format!("{:x}\r\n", response.body.len()).as_bytes());
            out.extend_from_slice(&response.body);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"0\r\n\r\n");
    } else {
        out.extend_from_slice(&response.body);
    }

    out
}

/// Writes one response to `stream` (spec §4.6 step 3).
pub async fn write_response(stream: &mut Stream, response: &Response, deadline: Duration) -> Result<(), IoError> {
    let out = encode_response(response);
    stream.write_all(&out, deadline).await
}

/// Writes one chunk of a chunked-encoding body (used by the SSE helper).
pub async fn write_chunk(stream: &mut Stream, chunk: &[u8], deadline: Duration) -> Result<(), IoError> {
    let mut out = Vec::with_capacity(chunk.len() + 16);
    out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
    out.extend_from_slice(chunk);
    out.extend_from_slice(b"\r\n");
    stream.write_all(&out, deadline).await
}

pub async fn write_chunked_headers(
    stream: &mut Stream,
    status: http::StatusCode,
    content_type: &str,
    deadline: Duration,
) -> Result<(), IoError> {
    let reason = status.canonical_reason().unwrap_or("");
    let out = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: keep-alive\r\n\r\n",
        status.as_u16(),
        reason,
        content_type,
    );
    stream.write_all(out.as_bytes(), deadline).await
}

pub async fn write_final_chunk(stream: &mut Stream, deadline: Duration) -> Result<(), IoError> {
    stream.write_all(b"0\r\n\r\n", deadline).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn ordinary_response_uses_content_length() {
        let response = Response::new(StatusCode::OK, "hello");
        let out = String::from_utf8(encode_response(&response)).unwrap();
        assert!(out.contains("Content-Length: 5\r\n"));
        assert!(!out.contains("Transfer-Encoding"));
        assert!(out.ends_with("hello"));
    }

    #[test]
    fn chunked_response_omits_content_length_and_frames_one_chunk() {
        let response = Response::new(StatusCode::OK, "hello").with_chunked_encoding();
        let out = encode_response(&response);
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains("Transfer-Encoding: chunked\r\n"));
        assert!(!text.contains("Content-Length"));
        assert!(text.ends_with("5\r\nhello\r\n0\r\n\r\n"));
    }

    #[test]
    fn chunked_empty_body_writes_only_the_final_chunk() {
        let response = Response::new(StatusCode::NO_CONTENT, "").with_chunked_encoding();
        let out = encode_response(&response);
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("\r\n\r\n0\r\n\r\n"));
        assert!(!text.contains("0\r\n\r\n0\r\n\r\n0\r\n\r\n"));
    }
}
