//! SETTINGS frame (spec §4.5.2).

use super::head::{Head, Kind, HEADER_LEN};
use crate::error::{H2Error, Reason};

pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4_096;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;
pub const MAX_MAX_FRAME_SIZE: u32 = 16_777_215;
pub const ACK_FLAG: u8 = 0x1;

const HEADER_TABLE_SIZE: u16 = 0x1;
const ENABLE_PUSH: u16 = 0x2;
const MAX_CONCURRENT_STREAMS: u16 = 0x3;
const INITIAL_WINDOW_SIZE: u16 = 0x4;
const MAX_FRAME_SIZE: u16 = 0x5;
const MAX_HEADER_LIST_SIZE: u16 = 0x6;

#[derive(Debug, Clone, Copy, Default)]
pub struct Settings {
    pub header_table_size: Option<u32>,
    pub enable_push: Option<bool>,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub max_header_list_size: Option<u32>,
}

impl Settings {
    pub fn is_ack(head: &Head) -> bool {
        head.flags & ACK_FLAG != 0
    }

    pub fn ack() -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        Head { kind: Kind::Settings, flags: ACK_FLAG, stream_id: 0, length: 0 }.encode(&mut out);
        out
    }

    pub fn parse(head: &Head, payload: &[u8]) -> Result<Settings, H2Error> {
        if head.stream_id != 0 {
            return Err(H2Error::Connection(Reason::ProtocolError));
        }
        if Self::is_ack(head) {
            if !payload.is_empty() {
                return Err(H2Error::Connection(Reason::FrameSizeError));
            }
            return Ok(Settings::default());
        }
        if payload.len() % 6 != 0 {
            return Err(H2Error::Connection(Reason::FrameSizeError));
        }

        let mut settings = Settings::default();
        for chunk in payload.chunks_exact(6) {
            let id = u16::from_be_bytes([chunk[0], chunk[1]]);
            let value = u32::from_be_bytes([chunk[2], chunk[3], chunk[4], chunk[5]]);
            match id {
                HEADER_TABLE_SIZE => settings.header_table_size = Some(value),
                ENABLE_PUSH => match value {
                    0 => settings.enable_push = Some(false),
                    1 => settings.enable_push = Some(true),
                    _ => return Err(H2Error::Connection(Reason::ProtocolError)),
                },
                MAX_CONCURRENT_STREAMS => settings.max_concurrent_streams = Some(value),
                INITIAL_WINDOW_SIZE => {
                    if value > 0x7fff_ffff {
                        return Err(H2Error::Connection(Reason::FlowControlError));
                    }
                    settings.initial_window_size = Some(value);
                }
                MAX_FRAME_SIZE => {
                    if !(DEFAULT_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&value) {
                        return Err(H2Error::Connection(Reason::ProtocolError));
                    }
                    settings.max_frame_size = Some(value);
                }
                MAX_HEADER_LIST_SIZE => settings.max_header_list_size = Some(value),
                _ => {} // unknown setting, ignored per RFC 7540 §6.5.2
            }
        }
        Ok(settings)
    }

    pub fn encode(&self, dst: &mut Vec<u8>) {
        let mut payload = Vec::new();
        let mut push = |id: u16, v: u32| {
            payload.extend_from_slice(&id.to_be_bytes());
            payload.extend_from_slice(&v.to_be_bytes());
        };
        if let Some(v) = self.header_table_size {
            push(HEADER_TABLE_SIZE, v);
        }
        if let Some(v) = self.enable_push {
            push(ENABLE_PUSH, v as u32);
        }
        if let Some(v) = self.max_concurrent_streams {
            push(MAX_CONCURRENT_STREAMS, v);
        }
        if let Some(v) = self.initial_window_size {
            push(INITIAL_WINDOW_SIZE, v);
        }
        if let Some(v) = self.max_frame_size {
            push(MAX_FRAME_SIZE, v);
        }
        if let Some(v) = self.max_header_list_size {
            push(MAX_HEADER_LIST_SIZE, v);
        }
        Head { kind: Kind::Settings, flags: 0, stream_id: 0, length: payload.len() }.encode(dst);
        dst.extend_from_slice(&payload);
    }
}
