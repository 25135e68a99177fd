//! Minimal echo server exercising both the HTTP/1.1 and HTTP/2 listeners.
//!
//! `GET /` replies with a small greeting; any other path echoes the request
//! method, path, and body back to the caller. Run with:
//!
//!     cargo run --example echo_server
//!
//! then `curl http://127.0.0.1:8080/hello` or, for HTTP/2 over TLS, supply a
//! cert/key pair and hit `https://127.0.0.1:8443/hello` with a client that
//! negotiates `h2` over ALPN.

use bytes::Bytes;
use h2core::{Request, Response, Server, ServerOptionsBuilder};
use http::StatusCode;
use std::sync::Arc;

async fn handle(request: Request) -> Response {
    if request.path == "/" {
        return Response::text(StatusCode::OK, "h2core echo server\n");
    }

    let body = format!(
        "{} {}\n{} bytes of body\n",
        request.method,
        request.path,
        request.body.len(),
    );
    Response::text(StatusCode::OK, Bytes::from(body))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = ServerOptionsBuilder::new().http_port(8080).build();
    let server = Arc::new(Server::new(options, Arc::new(handle)));

    tracing::info!("listening on http://127.0.0.1:8080");

    let ctrl_c = {
        let server = server.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
            server.shutdown();
        }
    };

    tokio::select! {
        result = server.serve_http() => result,
        _ = ctrl_c => Ok(()),
    }
}
