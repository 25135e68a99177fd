//! Byte I/O (L0, spec §4.1): a deadline-bounded async byte stream over TCP
//! or TLS.

use crate::error::IoError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Either a plain TCP stream or a negotiated TLS stream over one. ALPN
/// selection happens before this type is constructed (spec §4.6 step 2);
/// from here on both variants are driven identically.
pub enum Stream {
    Tcp(TcpStream),
    Tls(Box<tokio_rustls::server::TlsStream<TcpStream>>),
}

impl Stream {
    pub fn is_tls(&self) -> bool {
        matches!(self, Stream::Tls(_))
    }

    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        match self {
            Stream::Tcp(s) => s.peer_addr().ok(),
            Stream::Tls(s) => s.get_ref().0.peer_addr().ok(),
        }
    }

    pub fn set_nodelay(&self, nodelay: bool) -> std::io::Result<()> {
        match self {
            Stream::Tcp(s) => s.set_nodelay(nodelay),
            Stream::Tls(s) => s.get_ref().0.set_nodelay(nodelay),
        }
    }

    /// Negotiated ALPN protocol, if any (spec §4.6 step 2).
    pub fn alpn_protocol(&self) -> Option<Vec<u8>> {
        match self {
            Stream::Tcp(_) => None,
            Stream::Tls(s) => s.get_ref().1.alpn_protocol().map(|p| p.to_vec()),
        }
    }

    pub async fn read(&mut self, buf: &mut [u8], deadline: Duration) -> Result<usize, IoError> {
        let fut = async {
            match self {
                Stream::Tcp(s) => s.read(buf).await,
                Stream::Tls(s) => s.read(buf).await,
            }
        };
        match tokio::time::timeout(deadline, fut).await {
            Ok(Ok(0)) => Err(IoError::Eof),
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(IoError::Io(e)),
            Err(_) => Err(IoError::Timeout),
        }
    }

    pub async fn write_all(&mut self, buf: &[u8], deadline: Duration) -> Result<(), IoError> {
        let fut = async {
            match self {
                Stream::Tcp(s) => s.write_all(buf).await,
                Stream::Tls(s) => s.write_all(buf).await,
            }
        };
        match tokio::time::timeout(deadline, fut).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(IoError::Io(e)),
            Err(_) => Err(IoError::Timeout),
        }
    }
}

impl AsyncRead for Stream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            Stream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Stream::Tcp(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            Stream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => std::pin::Pin::new(s).poll_flush(cx),
            Stream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            Stream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
