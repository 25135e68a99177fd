//! Server configuration (spec §3 `ServerOptions`).
//!
//! Immutable once the server starts. Builder pattern follows the sibling
//! `dpc-astra` `Server` builder: each knob is an `Option<T>` field defaulted
//! lazily at `build()`, set via a chained `fn name(mut self, val: T) -> Self`.

use std::time::Duration;

/// Opaque certificate + private key + ALPN protocol list, ready to hand to
/// the TLS layer. Loading certificates from disk/PEM is out of scope here
/// (spec §1, §6.3) — callers construct this from their own cert loader.
pub struct TlsIdentity {
    pub(crate) cert_chain: Vec<rustls::pki_types::CertificateDer<'static>>,
    pub(crate) private_key: rustls::pki_types::PrivateKeyDer<'static>,
    pub(crate) alpn: Vec<Vec<u8>>,
}

impl Clone for TlsIdentity {
    fn clone(&self) -> Self {
        TlsIdentity {
            cert_chain: self.cert_chain.clone(),
            private_key: self.private_key.clone_key(),
            alpn: self.alpn.clone(),
        }
    }
}

impl std::fmt::Debug for TlsIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsIdentity")
            .field("cert_chain_len", &self.cert_chain.len())
            .field("alpn", &self.alpn)
            .finish()
    }
}

impl TlsIdentity {
    pub fn new(
        cert_chain: Vec<rustls::pki_types::CertificateDer<'static>>,
        private_key: rustls::pki_types::PrivateKeyDer<'static>,
    ) -> Self {
        TlsIdentity {
            cert_chain,
            private_key,
            alpn: vec![b"h2".to_vec(), b"http/1.1".to_vec()],
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub http_port: u16,
    pub https_port: u16,
    pub tls_identity: Option<TlsIdentityHandle>,
    pub max_concurrent_connections: usize,
    pub max_request_body_size: usize,
    pub header_timeout: Duration,
    pub request_timeout: Duration,
    pub idle_timeout: Duration,
    pub h2_max_concurrent_streams: u32,
    pub h2_max_frame_size: u32,
    pub h2_max_header_list_size: u32,
    pub h2_initial_window_size: u32,
    pub h2_header_table_size: u32,
    pub h2_enable_push: bool,
    pub h2_max_pushed_streams_per_connection: u32,
    pub h2_max_pushed_resource_size: usize,
}

/// `TlsIdentity` wrapped in `Arc` so `ServerOptions` stays cheaply `Clone`.
pub type TlsIdentityHandle = std::sync::Arc<TlsIdentity>;

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            http_port: 0,
            https_port: 0,
            tls_identity: None,
            max_concurrent_connections: 10_000,
            max_request_body_size: 30 * 1024 * 1024,
            header_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(120),
            h2_max_concurrent_streams: 100,
            h2_max_frame_size: 16_384,
            h2_max_header_list_size: 8_192,
            h2_initial_window_size: 65_535,
            h2_header_table_size: 4_096,
            h2_enable_push: true,
            h2_max_pushed_streams_per_connection: 10,
            h2_max_pushed_resource_size: 1024 * 1024,
        }
    }
}

#[derive(Default)]
pub struct ServerOptionsBuilder {
    http_port: Option<u16>,
    https_port: Option<u16>,
    tls_identity: Option<TlsIdentityHandle>,
    max_concurrent_connections: Option<usize>,
    max_request_body_size: Option<usize>,
    header_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    idle_timeout: Option<Duration>,
    h2_max_concurrent_streams: Option<u32>,
    h2_max_frame_size: Option<u32>,
    h2_max_header_list_size: Option<u32>,
    h2_initial_window_size: Option<u32>,
    h2_header_table_size: Option<u32>,
    h2_enable_push: Option<bool>,
    h2_max_pushed_streams_per_connection: Option<u32>,
    h2_max_pushed_resource_size: Option<usize>,
}

macro_rules! setter {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, val: $ty) -> Self {
            self.$name = Some(val);
            self
        }
    };
}

impl ServerOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(http_port, u16);
    setter!(https_port, u16);
    setter!(max_concurrent_connections, usize);
    setter!(max_request_body_size, usize);
    setter!(header_timeout, Duration);
    setter!(request_timeout, Duration);
    setter!(idle_timeout, Duration);
    setter!(h2_max_concurrent_streams, u32);
    setter!(h2_max_frame_size, u32);
    setter!(h2_max_header_list_size, u32);
    setter!(h2_initial_window_size, u32);
    setter!(h2_header_table_size, u32);
    setter!(h2_enable_push, bool);
    setter!(h2_max_pushed_streams_per_connection, u32);
    setter!(h2_max_pushed_resource_size, usize);

    pub fn tls_identity(mut self, identity: TlsIdentity) -> Self {
        self.tls_identity = Some(std::sync::Arc::new(identity));
        self
    }

    pub fn build(self) -> ServerOptions {
        let d = ServerOptions::default();
        ServerOptions {
            http_port: self.http_port.unwrap_or(d.http_port),
            https_port: self.https_port.unwrap_or(d.https_port),
            tls_identity: self.tls_identity,
            max_concurrent_connections: self
                .max_concurrent_connections
                .unwrap_or(d.max_concurrent_connections),
            max_request_body_size: self
                .max_request_body_size
                .unwrap_or(d.max_request_body_size),
            header_timeout: self.header_timeout.unwrap_or(d.header_timeout),
            request_timeout: self.request_timeout.unwrap_or(d.request_timeout),
            idle_timeout: self.idle_timeout.unwrap_or(d.idle_timeout),
            h2_max_concurrent_streams: self
                .h2_max_concurrent_streams
                .unwrap_or(d.h2_max_concurrent_streams),
            h2_max_frame_size: self.h2_max_frame_size.unwrap_or(d.h2_max_frame_size),
            h2_max_header_list_size: self
                .h2_max_header_list_size
                .unwrap_or(d.h2_max_header_list_size),
            h2_initial_window_size: self
                .h2_initial_window_size
                .unwrap_or(d.h2_initial_window_size),
            h2_header_table_size: self
                .h2_header_table_size
                .unwrap_or(d.h2_header_table_size),
            h2_enable_push: self.h2_enable_push.unwrap_or(d.h2_enable_push),
            h2_max_pushed_streams_per_connection: self
                .h2_max_pushed_streams_per_connection
                .unwrap_or(d.h2_max_pushed_streams_per_connection),
            h2_max_pushed_resource_size: self
                .h2_max_pushed_resource_size
                .unwrap_or(d.h2_max_pushed_resource_size),
        }
    }
}
