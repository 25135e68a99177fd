//! Server-Sent Events helper.
//!
//! Named in spec §1 as an external collaborator specified only by
//! interface, not new core surface: this builds on the HTTP/1.1 chunked
//! writer already exposed by `h1` (§4.3.3/§9's chunked Transfer-Encoding
//! resolution) rather than adding a streaming-body concept to `Response`.

use crate::error::IoError;
use crate::h1::{write_chunk, write_chunked_headers, write_final_chunk};
use crate::io::Stream;
use crate::response::Response;
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::Stream as FutureStream;
use futures_util::StreamExt;
use std::time::Duration;

/// One `text/event-stream` event (W3C SSE framing: optional `event`/`id`/
/// `retry` fields followed by one or more `data:` lines, terminated by a
/// blank line).
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub event: Option<String>,
    pub id: Option<String>,
    pub retry: Option<u64>,
    pub data: String,
}

impl Event {
    pub fn data(data: impl Into<String>) -> Self {
        Event { data: data.into(), ..Default::default() }
    }

    pub fn with_event(mut self, name: impl Into<String>) -> Self {
        self.event = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_retry(mut self, millis: u64) -> Self {
        self.retry = Some(millis);
        self
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        if let Some(event) = &self.event {
            buf.put_slice(b"event: ");
            buf.put_slice(event.as_bytes());
            buf.put_u8(b'\n');
        }
        if let Some(id) = &self.id {
            buf.put_slice(b"id: ");
            buf.put_slice(id.as_bytes());
            buf.put_u8(b'\n');
        }
        if let Some(retry) = self.retry {
            buf.put_slice(format!("retry: {}\n", retry).as_bytes());
        }
        for line in self.data.split('\n') {
            buf.put_slice(b"data: ");
            buf.put_slice(line.as_bytes());
            buf.put_u8(b'\n');
        }
        buf.put_u8(b'\n');
    }
}

fn keepalive_comment() -> Bytes {
    Bytes::from_static(b": keepalive\n\n")
}

/// Buffers a fixed sequence of events into a single `Response` body. Use
/// this when the full event set is known up front; for a long-lived push
/// use [`stream_events`] instead.
#[derive(Debug, Default)]
pub struct EventStream {
    buf: BytesMut,
}

impl EventStream {
    pub fn new() -> Self {
        EventStream { buf: BytesMut::new() }
    }

    pub fn push(&mut self, event: Event) -> &mut Self {
        event.encode_into(&mut self.buf);
        self
    }

    pub fn push_comment(&mut self, comment: &str) -> &mut Self {
        self.buf.put_u8(b':');
        self.buf.put_slice(comment.as_bytes());
        self.buf.put_u8(b'\n');
        self.buf.put_u8(b'\n');
        self
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(http::StatusCode::OK, self.buf.freeze()).with_chunked_encoding();
        response.content_type = Some(http::HeaderValue::from_static("text/event-stream"));
        response
            .headers
            .insert(http::header::CACHE_CONTROL, http::HeaderValue::from_static("no-cache"));
        response
    }
}

/// Writes events from `events` to `stream` as they become available,
/// interleaving a `: keepalive` comment whenever `keepalive_interval`
/// elapses with no event, until `events` ends. Operates directly on the
/// raw connection stream (HTTP/1.1 only, chunked transfer coding), for
/// applications that want a genuinely long-lived push outside the
/// one-shot `Request -> Response` dispatch contract.
pub async fn stream_events<S>(
    stream: &mut Stream,
    mut events: S,
    keepalive_interval: Duration,
    write_deadline: Duration,
) -> Result<(), IoError>
where
    S: FutureStream<Item = Event> + Unpin,
{
    write_chunked_headers(stream, http::StatusCode::OK, "text/event-stream", write_deadline).await?;

    let mut ticker = tokio::time::interval(keepalive_interval);
    ticker.tick().await; // first tick fires immediately, skip it

    loop {
        tokio::select! {
            next = events.next() => {
                match next {
                    Some(event) => {
                        let mut buf = BytesMut::new();
                        event.encode_into(&mut buf);
                        write_chunk(stream, &buf, write_deadline).await?;
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                write_chunk(stream, &keepalive_comment(), write_deadline).await?;
            }
        }
    }

    write_final_chunk(stream, write_deadline).await
}
