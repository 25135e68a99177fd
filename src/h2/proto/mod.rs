//! The HTTP/2 protocol engine (L3, spec §4.5): stream state, flow control,
//! pseudo-header handling, and the connection task.

mod conn;
mod flow_control;
mod headers;
mod state;
mod stream;

pub use conn::serve_connection;
pub use headers::Trailers;
