//! GOAWAY frame (spec §4.5.2, §4.5.5).

use super::head::{parse_stream_id, Head, Kind, StreamId};
use crate::error::{H2Error, Reason};
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct GoAway {
    pub last_stream_id: StreamId,
    pub reason: Reason,
    pub debug_data: Bytes,
}

impl GoAway {
    pub fn parse(head: &Head, payload: &[u8]) -> Result<GoAway, H2Error> {
        if head.stream_id != 0 {
            return Err(H2Error::Connection(Reason::ProtocolError));
        }
        if payload.len() < 8 {
            return Err(H2Error::Connection(Reason::FrameSizeError));
        }
        let last_stream_id = parse_stream_id(u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]));
        let reason = Reason::from_u32(u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]));
        Ok(GoAway { last_stream_id, reason, debug_data: Bytes::copy_from_slice(&payload[8..]) })
    }

    pub fn encode(&self, dst: &mut Vec<u8>) {
        let length = 8 + self.debug_data.len();
        Head { kind: Kind::GoAway, flags: 0, stream_id: 0, length }.encode(dst);
        dst.extend_from_slice(&(self.last_stream_id & 0x7fff_ffff).to_be_bytes());
        dst.extend_from_slice(&(self.reason as u32).to_be_bytes());
        dst.extend_from_slice(&self.debug_data);
    }
}
