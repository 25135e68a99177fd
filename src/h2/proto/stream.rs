//! Per-stream bookkeeping held by the connection engine (spec §4.5.2,
//! §4.5.6).

use super::flow_control::FlowControl;
use super::headers::PartialRequest;
use super::state::State;
use bytes::BytesMut;

pub struct Stream {
    pub state: State,
    pub recv_flow: FlowControl,
    pub send_flow: FlowControl,
    pub body: BytesMut,
    pub header_block: BytesMut,
    pub request: Option<PartialRequest>,
    pub trailers: Option<http::HeaderMap>,
    pub is_pushed: bool,
}

impl Stream {
    pub fn new(initial_recv_window: u32, initial_send_window: u32) -> Stream {
        Stream {
            state: State::Idle,
            recv_flow: FlowControl::new(initial_recv_window),
            send_flow: FlowControl::new(initial_send_window),
            body: BytesMut::new(),
            header_block: BytesMut::new(),
            request: None,
            trailers: None,
            is_pushed: false,
        }
    }
}
