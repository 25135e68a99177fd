//! Connection- and stream-level flow control windows (spec §4.5.2
//! WINDOW_UPDATE, DATA; §4.5 concurrency model).

use crate::error::{H2Error, Reason};

pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;
const MAX_WINDOW_SIZE: i64 = (1i64 << 31) - 1;

/// A signed window. Can go negative after a SETTINGS `INITIAL_WINDOW_SIZE`
/// decrease is applied to streams that had already used part of their
/// previous window (RFC 7540 §6.9.2).
#[derive(Debug, Clone, Copy)]
pub struct FlowControl {
    window: i64,
}

impl FlowControl {
    pub fn new(initial: u32) -> FlowControl {
        FlowControl { window: initial as i64 }
    }

    pub fn available(&self) -> i64 {
        self.window
    }

    pub fn is_connection_error(is_stream: bool) -> H2Error {
        if is_stream {
            H2Error::Stream(Reason::FlowControlError)
        } else {
            H2Error::Connection(Reason::FlowControlError)
        }
    }

    /// Applies a WINDOW_UPDATE increment (spec §4.5.2). Zero increments are
    /// rejected by the frame parser before this is called.
    pub fn increment(&mut self, amount: u32, is_stream: bool) -> Result<(), H2Error> {
        let next = self.window + amount as i64;
        if next > MAX_WINDOW_SIZE {
            return Err(Self::is_connection_error(is_stream));
        }
        self.window = next;
        Ok(())
    }

    /// Applies a SETTINGS `INITIAL_WINDOW_SIZE` delta to an existing
    /// stream's send window (spec §4.5.2 SETTINGS).
    pub fn apply_settings_delta(&mut self, delta: i64) -> Result<(), H2Error> {
        let next = self.window + delta;
        if !(-MAX_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&next) {
            return Err(H2Error::Connection(Reason::FlowControlError));
        }
        self.window = next;
        Ok(())
    }

    pub fn debit(&mut self, amount: usize) {
        self.window -= amount as i64;
    }

    pub fn has_capacity(&self, amount: usize) -> bool {
        self.window >= amount as i64
    }

    /// True once the window has fallen to at most half its starting point
    /// and a WINDOW_UPDATE should be sent to restore credit (spec §4.5.2
    /// DATA: "low-water threshold").
    pub fn below_low_water(&self, initial: u32) -> bool {
        self.window <= (initial as i64) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debits_and_refills() {
        let mut fc = FlowControl::new(100);
        fc.debit(60);
        assert_eq!(fc.available(), 40);
        assert!(fc.below_low_water(100));
        fc.increment(60, true).unwrap();
        assert_eq!(fc.available(), 100);
    }

    #[test]
    fn rejects_overflow_increment() {
        let mut fc = FlowControl::new(DEFAULT_INITIAL_WINDOW_SIZE);
        let err = fc.increment(u32::MAX, false).unwrap_err();
        assert!(matches!(err, H2Error::Connection(Reason::FlowControlError)));
    }
}
