//! # Validation Middleware
//!
//! Buffers the request body, evaluates the request with the gateway, and
//! either rejects it with a classified JSON error or forwards it with a
//! [`MatchedOperation`] extension. The body is restored before forwarding.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use pgw_core::{HttpMethod, RequestDescriptor, ValidationDecision};

use crate::error::ApiError;
use crate::extractors::MatchedOperation;
use crate::state::AppState;

pub async fn validation_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    if declared_length(&parts).is_some_and(|len| len > state.body_limit) {
        return ApiError::PayloadTooLarge { limit: state.body_limit }.into_response();
    }
    let bytes = match to_bytes(body, state.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // `to_bytes` reports an exceeded limit as a length-limit error source.
            let too_large = std::error::Error::source(&e)
                .is_some_and(|s| s.is::<http_body_util::LengthLimitError>());
            return if too_large {
                ApiError::PayloadTooLarge { limit: state.body_limit }.into_response()
            } else {
                ApiError::BodyRead(e.to_string()).into_response()
            };
        }
    };

    let Some(descriptor) = describe(&parts, &bytes) else {
        let rejection = state
            .gateway
            .reject_unsupported_method(parts.method.as_str(), parts.uri.path());
        return ApiError::rejected(&rejection).into_response();
    };

    match state.gateway.evaluate(&descriptor) {
        ValidationDecision::Allowed(op) => {
            parts.extensions.insert(MatchedOperation::from(op));
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        ValidationDecision::Rejected(rejection) => ApiError::rejected(&rejection).into_response(),
    }
}

fn declared_length(parts: &Parts) -> Option<usize> {
    parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Build the framework-independent view of the request.
fn describe(parts: &Parts, body: &[u8]) -> Option<RequestDescriptor> {
    let method: HttpMethod = parts.method.as_str().parse().ok()?;
    let mut descriptor = RequestDescriptor::new(method, parts.uri.path());
    if let Some(query) = parts.uri.query() {
        descriptor = descriptor.with_query_string(query);
    }
    for (name, value) in &parts.headers {
        // Non-UTF-8 bytes are replaced, so the value still reaches schema checks.
        descriptor = descriptor.with_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }
    Some(descriptor.with_raw_body(body.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request as HttpRequest};

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn descriptor_carries_query_headers_and_body() {
        let p = parts(
            HttpRequest::builder()
                .method("POST")
                .uri("/profiles?page=2&tag=a&tag=b")
                .header("Content-Type", "application/json; charset=utf-8")
                .header("X-Tenant", "acme"),
        );
        let d = describe(&p, br#"{"a":1}"#).unwrap();
        assert_eq!(d.method(), HttpMethod::Post);
        assert_eq!(d.path(), "/profiles");
        assert_eq!(d.query_values("tag"), vec!["a", "b"]);
        assert_eq!(d.header("x-tenant"), Some("acme"));
        assert_eq!(d.media_type().as_deref(), Some("application/json"));
        assert_eq!(d.body(), br#"{"a":1}"#);
    }

    #[test]
    fn unsupported_method_has_no_descriptor() {
        let p = parts(HttpRequest::builder().method("CONNECT").uri("/profiles"));
        assert!(describe(&p, b"").is_none());
    }

    #[test]
    fn non_utf8_header_value_is_kept() {
        let mut p = parts(HttpRequest::builder().uri("/profiles"));
        p.headers.insert("x-tenant", HeaderValue::from_bytes(b"acme\xff").unwrap());
        let d = describe(&p, b"").unwrap();
        assert_eq!(d.header("x-tenant"), Some("acme\u{fffd}"));
    }

    #[test]
    fn content_length_is_parsed() {
        let p = parts(HttpRequest::builder().uri("/").header("content-length", "42"));
        assert_eq!(declared_length(&p), Some(42));
    }
}
