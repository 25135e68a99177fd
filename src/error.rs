//! Core error kinds, per spec §7.
//!
//! These are protocol-level errors the engine itself produces. Application
//! errors surfacing from the handler are converted to 500 problem-details
//! responses at the dispatch boundary (`dispatch::HandlerFailure`) and never
//! appear here.

use std::io;

/// Lower layer I/O failure: socket, TLS, or a read/write deadline.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("connection closed by peer")]
    Eof,
    #[error("operation timed out")]
    Timeout,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("tls error: {0}")]
    Tls(String),
}

/// HTTP/1.1 parser and framing failures (spec §4.3.4).
#[derive(Debug, thiserror::Error)]
pub enum Http1Error {
    #[error("incomplete request")]
    NeedMore,
    #[error("malformed request: {0}")]
    BadRequest(&'static str),
    #[error("request body exceeds configured limit")]
    PayloadTooLarge,
    #[error(transparent)]
    Io(#[from] IoError),
}

/// HTTP/2 connection- and stream-level errors, tagged with the `Reason`
/// that must accompany GOAWAY/RST_STREAM (spec §4.5.5, §7).
#[derive(Debug, thiserror::Error)]
pub enum H2Error {
    #[error("connection error: {0:?}")]
    Connection(Reason),
    #[error("stream error: {0:?}")]
    Stream(Reason),
    #[error(transparent)]
    Hpack(#[from] HpackError),
    #[error(transparent)]
    Io(#[from] IoError),
}

impl H2Error {
    pub fn reason(&self) -> Reason {
        match self {
            H2Error::Connection(r) | H2Error::Stream(r) => *r,
            H2Error::Hpack(_) => Reason::CompressionError,
            H2Error::Io(_) => Reason::InternalError,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, H2Error::Connection(_) | H2Error::Hpack(_))
    }
}

/// HPACK decoder failures (spec §4.2.5, §4.2.2, §4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HpackError {
    #[error("integer encoding exceeded continuation bound")]
    IntegerTooLarge,
    #[error("invalid huffman padding or embedded EOS symbol")]
    InvalidHuffmanCode,
    #[error("index referenced an entry outside the static+dynamic table")]
    InvalidTableIndex,
    #[error("dynamic table size update must appear at the start of a header block")]
    InvalidTableSizeUpdate,
    #[error("decoded header list exceeds the configured max header list size")]
    HeaderListTooLarge,
    #[error("truncated header block")]
    Truncated,
}

/// RFC 7540 §11.4 error codes, used on GOAWAY and RST_STREAM frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Reason {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

impl Reason {
    pub fn from_u32(v: u32) -> Reason {
        use Reason::*;
        match v {
            0x0 => NoError,
            0x1 => ProtocolError,
            0x2 => InternalError,
            0x3 => FlowControlError,
            0x4 => SettingsTimeout,
            0x5 => StreamClosed,
            0x6 => FrameSizeError,
            0x7 => RefusedStream,
            0x8 => Cancel,
            0x9 => CompressionError,
            0xa => ConnectError,
            0xb => EnhanceYourCalm,
            0xc => InadequateSecurity,
            0xd => Http11Required,
            _ => InternalError,
        }
    }
}
