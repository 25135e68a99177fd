//! PING frame: 8-octet opaque payload (spec §4.5.2).

use super::head::{Head, Kind};
use crate::error::{H2Error, Reason};

pub const ACK_FLAG: u8 = 0x1;

#[derive(Debug, Clone, Copy)]
pub struct Ping {
    pub payload: [u8; 8],
    pub ack: bool,
}

impl Ping {
    pub fn parse(head: &Head, payload: &[u8]) -> Result<Ping, H2Error> {
        if head.stream_id != 0 {
            return Err(H2Error::Connection(Reason::ProtocolError));
        }
        if payload.len() != 8 {
            return Err(H2Error::Connection(Reason::FrameSizeError));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(payload);
        Ok(Ping { payload: buf, ack: head.flags & ACK_FLAG != 0 })
    }

    pub fn encode(&self, dst: &mut Vec<u8>) {
        let flags = if self.ack { ACK_FLAG } else { 0 };
        Head { kind: Kind::Ping, flags, stream_id: 0, length: 8 }.encode(dst);
        dst.extend_from_slice(&self.payload);
    }
}
