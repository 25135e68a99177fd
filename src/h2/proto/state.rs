//! Per-stream state machine (spec §4.5.6).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl State {
    pub fn recv_headers(self, end_stream: bool) -> Option<State> {
        use State::*;
        match self {
            Idle if end_stream => Some(HalfClosedRemote),
            Idle => Some(Open),
            Open if end_stream => Some(HalfClosedRemote),
            Open => Some(Open), // trailers
            HalfClosedLocal if end_stream => Some(Closed),
            HalfClosedLocal => Some(HalfClosedLocal),
            _ => None,
        }
    }

    pub fn recv_data(self, end_stream: bool) -> Option<State> {
        use State::*;
        match self {
            Open if end_stream => Some(HalfClosedRemote),
            Open => Some(Open),
            HalfClosedLocal if end_stream => Some(Closed),
            HalfClosedLocal => Some(HalfClosedLocal),
            _ => None,
        }
    }

    pub fn send_headers(self, end_stream: bool) -> Option<State> {
        use State::*;
        match self {
            Idle => Some(ReservedLocal),
            // A pushed stream never hears from the client; once we send its
            // response headers the remote side is already as closed as it
            // will ever get (spec §4.5.4).
            ReservedLocal if end_stream => Some(Closed),
            ReservedLocal => Some(HalfClosedRemote),
            Open if end_stream => Some(HalfClosedLocal),
            Open => Some(Open),
            HalfClosedRemote if end_stream => Some(Closed),
            HalfClosedRemote => Some(HalfClosedRemote),
            _ => None,
        }
    }

    pub fn send_data_end_stream(self) -> State {
        use State::*;
        match self {
            HalfClosedRemote => Closed,
            _ => HalfClosedLocal,
        }
    }

    pub fn reset(self) -> State {
        State::Closed
    }

    pub fn is_closed(self) -> bool {
        matches!(self, State::Closed)
    }

    pub fn can_recv_data(self) -> bool {
        matches!(self, State::Open | State::HalfClosedLocal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_body_closes_on_headers() {
        let s = State::Idle.recv_headers(true).unwrap();
        assert_eq!(s, State::HalfClosedRemote);
        assert!(!s.can_recv_data());
    }

    #[test]
    fn request_with_body_then_response_round_trip() {
        let s = State::Idle.recv_headers(false).unwrap();
        assert_eq!(s, State::Open);
        let s = s.recv_data(true).unwrap();
        assert_eq!(s, State::HalfClosedRemote);
        let s = s.send_headers(false).unwrap();
        assert_eq!(s, State::HalfClosedRemote);
        let s = s.send_data_end_stream();
        assert_eq!(s, State::Closed);
        assert!(s.is_closed());
    }

    #[test]
    fn pushed_stream_headers_only_closes_immediately() {
        let s = State::Idle.send_headers(false).unwrap();
        assert_eq!(s, State::ReservedLocal);
        let s = s.send_headers(true).unwrap();
        assert_eq!(s, State::Closed);
    }

    #[test]
    fn pushed_stream_with_body_half_closes_then_completes() {
        let s = State::ReservedLocal.send_headers(false).unwrap();
        assert_eq!(s, State::HalfClosedRemote);
        let s = s.send_data_end_stream();
        assert_eq!(s, State::Closed);
    }

    #[test]
    fn data_after_local_half_close_is_rejected() {
        assert_eq!(State::HalfClosedLocal.recv_data(false), Some(State::HalfClosedLocal));
        assert_eq!(State::Closed.recv_data(false), None);
    }

    #[test]
    fn reset_always_closes() {
        assert_eq!(State::Open.reset(), State::Closed);
        assert_eq!(State::Idle.reset(), State::Closed);
    }
}
