//! DATA frame, including the PADDED flag (spec §4.5.2).

use super::head::{Head, Kind, StreamId};
use crate::error::{H2Error, Reason};
use bytes::Bytes;

pub const END_STREAM: u8 = 0x1;
pub const PADDED: u8 = 0x8;

#[derive(Debug, Clone)]
pub struct Data {
    pub stream_id: StreamId,
    pub payload: Bytes,
    pub end_stream: bool,
}

impl Data {
    /// Parses payload already stripped of the frame header. Returns the
    /// decoded data and the total on-wire payload length (data + padding +
    /// the pad-length octet), which is what flow control must debit (spec
    /// §4.5.2 DATA: "including padding").
    pub fn parse(head: &Head, payload: &[u8]) -> Result<(Data, usize), H2Error> {
        if head.stream_id == 0 {
            return Err(H2Error::Connection(Reason::ProtocolError));
        }
        let wire_len = payload.len();
        let body = if head.flags & PADDED != 0 {
            let Some(&pad_len) = payload.first() else {
                return Err(H2Error::Connection(Reason::FrameSizeError));
            };
            let pad_len = pad_len as usize;
            let rest = &payload[1..];
            if pad_len > rest.len() {
                return Err(H2Error::Connection(Reason::ProtocolError));
            }
            &rest[..rest.len() - pad_len]
        } else {
            payload
        };

        Ok((
            Data {
                stream_id: head.stream_id,
                payload: Bytes::copy_from_slice(body),
                end_stream: head.flags & END_STREAM != 0,
            },
            wire_len,
        ))
    }

    /// Encodes one DATA frame (no padding on write — the engine never pads
    /// its own responses).
    pub fn encode(stream_id: StreamId, chunk: &[u8], end_stream: bool, dst: &mut Vec<u8>) {
        let flags = if end_stream { END_STREAM } else { 0 };
        Head { kind: Kind::Data, flags, stream_id, length: chunk.len() }.encode(dst);
        dst.extend_from_slice(chunk);
    }
}
