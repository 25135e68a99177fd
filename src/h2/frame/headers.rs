//! HEADERS, PUSH_PROMISE, and CONTINUATION framing (spec §4.5.2).
//!
//! These frames only carry a fragment of a header block — decoding the
//! fragment through HPACK, and reassembling fragments split across
//! CONTINUATION frames, is the connection engine's job (`proto::headers`).
//! This module strips padding and the optional priority prefix and hands
//! back the raw fragment.

use super::head::{parse_stream_id, Head, Kind, StreamId};
use crate::error::{H2Error, Reason};
use bytes::Bytes;

pub const END_STREAM: u8 = 0x1;
pub const END_HEADERS: u8 = 0x4;
pub const PADDED: u8 = 0x8;
pub const PRIORITY: u8 = 0x20;

#[derive(Debug, Clone)]
pub struct Headers {
    pub stream_id: StreamId,
    pub fragment: Bytes,
    pub end_stream: bool,
    pub end_headers: bool,
}

fn strip_padding(flags: u8, payload: &[u8]) -> Result<&[u8], H2Error> {
    if flags & PADDED != 0 {
        let Some(&pad_len) = payload.first() else {
            return Err(H2Error::Connection(Reason::FrameSizeError));
        };
        let pad_len = pad_len as usize;
        let rest = &payload[1..];
        if pad_len > rest.len() {
            return Err(H2Error::Connection(Reason::ProtocolError));
        }
        Ok(&rest[..rest.len() - pad_len])
    } else {
        Ok(payload)
    }
}

impl Headers {
    pub fn parse(head: &Head, payload: &[u8]) -> Result<Headers, H2Error> {
        if head.stream_id == 0 || head.stream_id % 2 == 0 {
            return Err(H2Error::Connection(Reason::ProtocolError));
        }
        let mut body = strip_padding(head.flags, payload)?;
        if head.flags & PRIORITY != 0 {
            if body.len() < 5 {
                return Err(H2Error::Connection(Reason::FrameSizeError));
            }
            body = &body[5..]; // stream dependency (4) + weight (1), ignored
        }
        Ok(Headers {
            stream_id: head.stream_id,
            fragment: Bytes::copy_from_slice(body),
            end_stream: head.flags & END_STREAM != 0,
            end_headers: head.flags & END_HEADERS != 0,
        })
    }

    pub fn encode_head(stream_id: StreamId, block_len: usize, end_headers: bool, end_stream: bool, dst: &mut Vec<u8>) {
        let mut flags = if end_stream { END_STREAM } else { 0 };
        if end_headers {
            flags |= END_HEADERS;
        }
        Head { kind: Kind::Headers, flags, stream_id, length: block_len }.encode(dst);
    }
}

#[derive(Debug, Clone)]
pub struct PushPromise {
    pub stream_id: StreamId,
    pub promised_id: StreamId,
    pub fragment: Bytes,
    pub end_headers: bool,
}

impl PushPromise {
    pub fn parse(head: &Head, payload: &[u8]) -> Result<PushPromise, H2Error> {
        let body = strip_padding(head.flags, payload)?;
        if body.len() < 4 {
            return Err(H2Error::Connection(Reason::FrameSizeError));
        }
        let promised_id = parse_stream_id(u32::from_be_bytes([body[0], body[1], body[2], body[3]]));
        Ok(PushPromise {
            stream_id: head.stream_id,
            promised_id,
            fragment: Bytes::copy_from_slice(&body[4..]),
            end_headers: head.flags & END_HEADERS != 0,
        })
    }

    pub fn encode_head(stream_id: StreamId, promised_id: StreamId, block_len: usize, end_headers: bool, dst: &mut Vec<u8>) {
        let flags = if end_headers { END_HEADERS } else { 0 };
        Head { kind: Kind::PushPromise, flags, stream_id, length: block_len + 4 }.encode(dst);
        dst.extend_from_slice(&(promised_id & 0x7fff_ffff).to_be_bytes());
    }
}

#[derive(Debug, Clone)]
pub struct Continuation {
    pub stream_id: StreamId,
    pub fragment: Bytes,
    pub end_headers: bool,
}

impl Continuation {
    pub fn parse(head: &Head, payload: &[u8]) -> Result<Continuation, H2Error> {
        Ok(Continuation {
            stream_id: head.stream_id,
            fragment: Bytes::copy_from_slice(payload),
            end_headers: head.flags & END_HEADERS != 0,
        })
    }

    pub fn encode_head(stream_id: StreamId, block_len: usize, end_headers: bool, dst: &mut Vec<u8>) {
        let flags = if end_headers { END_HEADERS } else { 0 };
        Head { kind: Kind::Continuation, flags, stream_id, length: block_len }.encode(dst);
    }
}
