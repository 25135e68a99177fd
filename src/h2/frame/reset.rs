//! RST_STREAM frame (spec §4.5.2).

use super::head::{Head, Kind, StreamId};
use crate::error::{H2Error, Reason};

#[derive(Debug, Clone, Copy)]
pub struct RstStream {
    pub stream_id: StreamId,
    pub reason: Reason,
}

impl RstStream {
    pub fn parse(head: &Head, payload: &[u8]) -> Result<RstStream, H2Error> {
        if head.stream_id == 0 {
            return Err(H2Error::Connection(Reason::ProtocolError));
        }
        if payload.len() != 4 {
            return Err(H2Error::Connection(Reason::FrameSizeError));
        }
        let reason = Reason::from_u32(u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]));
        Ok(RstStream { stream_id: head.stream_id, reason })
    }

    pub fn encode(&self, dst: &mut Vec<u8>) {
        Head { kind: Kind::RstStream, flags: 0, stream_id: self.stream_id, length: 4 }.encode(dst);
        dst.extend_from_slice(&(self.reason as u32).to_be_bytes());
    }
}
