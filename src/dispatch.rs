//! Dispatch boundary (L5, spec §4.7, §6.2).
//!
//! Adapts a parsed [`Request`](crate::request::Request) into the
//! application handler contract and owns the error-to-response mapping for
//! protocol-level failures. The core knows nothing about routing, DI,
//! validation, or JSON decoding of application payloads — those live above
//! this boundary (spec §1, §9).

use crate::request::Request;
use crate::response::Response;
use bytes::Bytes;
use futures_util::FutureExt;
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

/// A single application handler function, per spec §6.2:
/// `async fn handler(request: Request) -> Response`.
pub trait Handler: Send + Sync + 'static {
    fn call(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(request))
    }
}

pub type SharedHandler = Arc<dyn Handler>;

#[derive(Serialize)]
struct ProblemDetails<'a> {
    #[serde(rename = "type")]
    type_uri: &'a str,
    title: &'a str,
    status: u16,
    detail: &'a str,
    instance: &'a str,
}

/// Problem-details body per RFC 7807, emitted for every protocol-level
/// failure mapped at this boundary (spec §6.1, §7).
pub fn problem_response(status: StatusCode, title: &str, detail: &str, instance: &str) -> Response {
    let problem = ProblemDetails {
        type_uri: "about:blank",
        title,
        status: status.as_u16(),
        detail,
        instance,
    };
    let body = serde_json::to_string(&problem).unwrap_or_else(|_| {
        "{\"type\":\"about:blank\",\"title\":\"Internal Server Error\",\"status\":500}".to_string()
    });
    Response {
        status,
        headers: http::HeaderMap::new(),
        body: Bytes::from(body),
        content_type: Some(HeaderValue::from_static("application/problem+json")),
        keep_alive: true,
        chunked: false,
    }
}

pub fn not_found(instance: &str) -> Response {
    problem_response(StatusCode::NOT_FOUND, "Not Found", "no route matched the request", instance)
}

pub fn payload_too_large(instance: &str) -> Response {
    problem_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        "Payload Too Large",
        "request body exceeds the configured maximum",
        instance,
    )
}

pub fn unsupported_media_type(instance: &str) -> Response {
    problem_response(
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "Unsupported Media Type",
        "the request content type is not supported",
        instance,
    )
}

pub fn internal_error(instance: &str) -> Response {
    problem_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        "the handler failed to produce a response",
        instance,
    )
}

/// Invokes the handler, catching panics and converting them to a 500
/// problem-details response (spec §4.7, §6.2) instead of tearing down the
/// connection task.
pub async fn dispatch(handler: &SharedHandler, request: Request, instance: &str) -> Response {
    let fut = handler.call(request);
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(instance, "handler panicked");
            internal_error(instance)
        }
    }
}
