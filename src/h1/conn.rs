//! Keep-alive connection loop: parse → dispatch → write → repeat (spec
//! §4.6 step 3), bounded by header/request/idle timeouts (spec §4.6).

use super::parser::{parse_request, ParseOutcome};
use super::writer::write_response;
use crate::dispatch::{self, SharedHandler};
use crate::error::{Http1Error, IoError};
use crate::io::Stream;
use crate::metrics::Metrics;
use crate::options::ServerOptions;
use std::net::SocketAddr;

const READ_CHUNK: usize = 8 * 1024;

pub async fn serve_connection(
    stream: &mut Stream,
    options: &ServerOptions,
    handler: &SharedHandler,
    metrics: &Metrics,
    remote_addr: Option<SocketAddr>,
    mut shutdown: Option<tokio::sync::watch::Receiver<bool>>,
) -> Result<(), IoError> {
    let is_https = stream.is_tls();
    let mut buf: Vec<u8> = Vec::new();
    let mut first_request = true;

    loop {
        if let Some(rx) = &shutdown {
            if *rx.borrow() && buf.is_empty() {
                return Ok(());
            }
        }

        let request = loop {
            match parse_request(&buf, options.max_request_body_size, is_https, remote_addr) {
                Ok(ParseOutcome::Parsed { request, consumed }) => {
                    buf.drain(..consumed);
                    break request;
                }
                Ok(ParseOutcome::NeedMore) => {
                    // The first request on a fresh connection waits out the idle
                    // timeout for its initial bytes; once a request is underway,
                    // or on a subsequent keep-alive request, the tighter header
                    // timeout applies (spec §4.6).
                    let header_deadline = if first_request {
                        options.idle_timeout
                    } else {
                        options.header_timeout
                    };
                    let mut chunk = [0u8; READ_CHUNK];
                    let shutdown_signal = async {
                        match &mut shutdown {
                            Some(rx) => {
                                let _ = rx.changed().await;
                            }
                            None => std::future::pending().await,
                        }
                    };
                    let n = if buf.is_empty() {
                        tokio::select! {
                            n = stream.read(&mut chunk, header_deadline) => n?,
                            _ = shutdown_signal => return Ok(()),
                        }
                    } else {
                        // Bytes of a request are already in `buf`: a timeout here must
                        // reply 408 before closing rather than dropping silently
                        // (spec §4.3.4, §7); an empty `buf` (handled above) closes
                        // silently since the client never started a request.
                        match stream.read(&mut chunk, header_deadline).await {
                            Ok(n) => n,
                            Err(IoError::Timeout) => {
                                let response = dispatch::problem_response(
                                    http::StatusCode::REQUEST_TIMEOUT,
                                    "Request Timeout",
                                    "timed out waiting for the remainder of the request",
                                    "/",
                                );
                                write_response(stream, &response, options.request_timeout).await?;
                                return Ok(());
                            }
                            Err(e) => return Err(e),
                        }
                    };
                    metrics.add_bytes_in(n as u64);
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.len() > 16 * 1024 * 1024 {
                        return Err(IoError::Io(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "request exceeds buffering limit",
                        )));
                    }
                }
                Err(Http1Error::PayloadTooLarge) => {
                    let response = dispatch::payload_too_large("/");
                    write_response(stream, &response, options.request_timeout).await?;
                    return Ok(());
                }
                Err(Http1Error::BadRequest(msg)) => {
                    let response = dispatch::problem_response(
                        http::StatusCode::BAD_REQUEST,
                        "Bad Request",
                        msg,
                        "/",
                    );
                    write_response(stream, &response, options.request_timeout).await?;
                    return Ok(());
                }
                Err(Http1Error::Io(e)) => return Err(e),
                Err(Http1Error::NeedMore) => unreachable!("parser signals via ParseOutcome, not this variant"),
            }
        };

        first_request = false;
        let keep_alive = request.keep_alive;
        let instance = request.path.clone();

        let response = tokio::time::timeout(
            options.request_timeout,
            dispatch::dispatch(handler, request, &instance),
        )
        .await
        .unwrap_or_else(|_| dispatch::problem_response(
            http::StatusCode::GATEWAY_TIMEOUT,
            "Gateway Timeout",
            "handler exceeded the request timeout",
            &instance,
        ));

        let mut response = response;
        response.keep_alive = keep_alive && response.keep_alive;

        metrics.add_bytes_out(response.body.len() as u64);
        write_response(stream, &response, options.request_timeout).await?;
        metrics.request_completed();

        if !response.keep_alive {
            return Ok(());
        }
    }
}
