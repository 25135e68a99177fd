//! PRIORITY frame: parsed to validate framing, otherwise ignored (spec
//! §4.5.2 — no scheduler).

use super::head::Head;
use crate::error::{H2Error, Reason};

pub fn validate(head: &Head, payload: &[u8]) -> Result<(), H2Error> {
    if head.stream_id == 0 {
        return Err(H2Error::Connection(Reason::ProtocolError));
    }
    if payload.len() != 5 {
        return Err(H2Error::Connection(Reason::FrameSizeError));
    }
    Ok(())
}
