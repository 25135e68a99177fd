//! Wire-level HTTP/1.1 and HTTP/2 engine.
//!
//! Layered L0..L5 per the design: byte I/O, HPACK, HTTP/1.1 parsing,
//! HTTP/2 framing and connection engine, the connection manager (accept
//! loop + TLS/ALPN), and the dispatch boundary to an application handler.

pub mod dispatch;
pub mod error;
pub mod h1;
pub mod h2;
pub mod hpack;
pub mod io;
pub mod metrics;
pub mod options;
pub mod request;
pub mod response;
pub mod server;
pub mod sse;

pub use dispatch::Handler;
pub use h2::Trailers;
pub use options::{ServerOptions, ServerOptionsBuilder, TlsIdentity};
pub use request::Request;
pub use response::Response;
pub use server::Server;
