//! Connection manager (L4, spec §4.6): accept loop, TLS handshake + ALPN
//! protocol demux, per-connection concurrency bound, graceful shutdown.

use crate::dispatch::SharedHandler;
use crate::io::Stream as IoStream;
use crate::metrics::Metrics;
use crate::options::ServerOptions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// Lock-free slot counter bounding live connections (spec §4.6: "a
/// lock-free counter: acquire a slot with compare-and-exchange").
struct Slots {
    max: usize,
    used: AtomicUsize,
}

impl Slots {
    fn new(max: usize) -> Self {
        Slots { max, used: AtomicUsize::new(0) }
    }

    fn try_acquire(&self) -> bool {
        let mut current = self.used.load(Ordering::Acquire);
        loop {
            if current >= self.max {
                return false;
            }
            match self.used.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    fn release(&self) {
        self.used.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Owns the listeners and drives accepted connections to completion.
pub struct Server {
    options: Arc<ServerOptions>,
    handler: SharedHandler,
    metrics: Metrics,
    slots: Arc<Slots>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    pub fn new(options: ServerOptions, handler: SharedHandler) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Server {
            slots: Arc::new(Slots::new(options.max_concurrent_connections)),
            options: Arc::new(options),
            handler,
            metrics: Metrics::default(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    /// Signals every live connection to drain (spec §4.6 "graceful
    /// shutdown"). HTTP/1.1 connections finish the in-flight request and
    /// close; HTTP/2 connections send GOAWAY and drain outstanding streams.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Runs the plain-HTTP listener. Returns once the socket closes or
    /// shutdown is signalled and all connections have drained.
    pub async fn serve_http(&self) -> std::io::Result<()> {
        if self.options.http_port == 0 {
            return Ok(());
        }
        let listener = TcpListener::bind(("0.0.0.0", self.options.http_port)).await?;
        self.accept_loop(listener, None).await
    }

    /// Runs the HTTPS listener with ALPN offering `{h2, http/1.1}` in that
    /// order (spec §4.6 step 2, §6.3).
    pub async fn serve_https(&self) -> std::io::Result<()> {
        let Some(identity) = self.options.tls_identity.clone() else {
            return Ok(());
        };
        if self.options.https_port == 0 {
            return Ok(());
        }
        let mut server_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(identity.cert_chain.clone(), identity.private_key.clone_key())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        server_config.alpn_protocols = identity.alpn.clone();
        let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(server_config));

        let listener = TcpListener::bind(("0.0.0.0", self.options.https_port)).await?;
        self.accept_loop(listener, Some(acceptor)).await
    }

    async fn accept_loop(
        &self,
        listener: TcpListener,
        acceptor: Option<tokio_rustls::TlsAcceptor>,
    ) -> std::io::Result<()> {
        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, remote_addr) = accepted?;
                    if !self.slots.try_acquire() {
                        tracing::warn!("connection slots exhausted, dropping accept");
                        continue;
                    }
                    self.spawn_connection(socket, remote_addr, acceptor.clone());
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn spawn_connection(
        &self,
        socket: TcpStream,
        remote_addr: std::net::SocketAddr,
        acceptor: Option<tokio_rustls::TlsAcceptor>,
    ) {
        let options = self.options.clone();
        let handler = self.handler.clone();
        let metrics = self.metrics.clone();
        let slots = self.slots.clone();
        let shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            let _ = socket.set_nodelay(true);
            metrics.connection_accepted();

            let result = match acceptor {
                Some(acceptor) => handle_tls_connection(socket, acceptor, &options, &handler, &metrics, remote_addr, shutdown_rx).await,
                None => handle_plain_connection(socket, &options, &handler, &metrics, remote_addr, shutdown_rx).await,
            };
            if let Err(e) = result {
                tracing::debug!(%e, "connection ended with error");
            }

            metrics.connection_closed();
            slots.release();
        });
    }
}

async fn handle_plain_connection(
    socket: TcpStream,
    options: &ServerOptions,
    handler: &SharedHandler,
    metrics: &Metrics,
    remote_addr: std::net::SocketAddr,
    shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let mut stream = IoStream::Tcp(socket);
    crate::h1::serve_connection(&mut stream, options, handler, metrics, Some(remote_addr), Some(shutdown_rx))
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))
}

async fn handle_tls_connection(
    socket: TcpStream,
    acceptor: tokio_rustls::TlsAcceptor,
    options: &ServerOptions,
    handler: &SharedHandler,
    metrics: &Metrics,
    remote_addr: std::net::SocketAddr,
    shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let tls_stream = acceptor.accept(socket).await?;
    let alpn = tls_stream.get_ref().1.alpn_protocol().map(|p| p.to_vec());
    let mut stream = IoStream::Tls(Box::new(tls_stream));

    match alpn.as_deref() {
        Some(b"h2") => crate::h2::serve_connection(&mut stream, options, handler, metrics, Some(remote_addr), Some(shutdown_rx))
            .await
            .map_err(|e| std::io::Error::other(e.to_string())),
        _ => crate::h1::serve_connection(&mut stream, options, handler, metrics, Some(remote_addr), Some(shutdown_rx))
            .await
            .map_err(|e| std::io::Error::other(e.to_string())),
    }
}
