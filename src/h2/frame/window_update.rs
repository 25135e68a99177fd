//! WINDOW_UPDATE frame (spec §4.5.2).

use super::head::{parse_stream_id, Head, Kind, StreamId};
use crate::error::{H2Error, Reason};

#[derive(Debug, Clone, Copy)]
pub struct WindowUpdate {
    pub stream_id: StreamId,
    pub increment: u32,
}

impl WindowUpdate {
    pub fn parse(head: &Head, payload: &[u8]) -> Result<WindowUpdate, H2Error> {
        if payload.len() != 4 {
            return Err(H2Error::Connection(Reason::FrameSizeError));
        }
        let increment = parse_stream_id(u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]));
        if increment == 0 {
            let reason = Reason::ProtocolError;
            return Err(if head.stream_id == 0 {
                H2Error::Connection(reason)
            } else {
                H2Error::Stream(reason)
            });
        }
        Ok(WindowUpdate { stream_id: head.stream_id, increment })
    }

    pub fn encode(&self, dst: &mut Vec<u8>) {
        Head { kind: Kind::WindowUpdate, flags: 0, stream_id: self.stream_id, length: 4 }.encode(dst);
        dst.extend_from_slice(&(self.increment & 0x7fff_ffff).to_be_bytes());
    }
}
