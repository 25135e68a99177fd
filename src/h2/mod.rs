//! HTTP/2 support (spec §4.4, §4.5): framing and the connection engine.

pub mod frame;
pub mod proto;

pub use proto::{serve_connection, Trailers};
