//! HTTP response builders.
//!
//! Provides convenient functions for building JSON responses.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Response body type used throughout routedoc.
pub type Body = Full<Bytes>;

/// Full response type used throughout routedoc.
pub type HttpResponse = Response<Body>;

fn json_body(status: StatusCode, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with the given status code and body.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> crate::Result<HttpResponse> {
    let json = serde_json::to_vec(body)?;
    Ok(json_body(status, Bytes::from(json)))
}

/// Build a 200 OK JSON response.
pub fn ok<T: Serialize + ?Sized>(body: &T) -> crate::Result<HttpResponse> {
    json(StatusCode::OK, body)
}

/// Build a 201 Created JSON response.
pub fn created<T: Serialize + ?Sized>(body: &T) -> crate::Result<HttpResponse> {
    json(StatusCode::CREATED, body)
}

/// Build a `{"error": message}` JSON response.
pub fn error(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message });
    json_body(status, Bytes::from(body.to_string()))
}

/// Build a 404 Not Found JSON response.
pub fn not_found(message: &str) -> HttpResponse {
    error(StatusCode::NOT_FOUND, message)
}

/// Build a 405 Method Not Allowed JSON response.
pub fn method_not_allowed() -> HttpResponse {
    error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Build a 413 Payload Too Large JSON response.
pub fn payload_too_large() -> HttpResponse {
    error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
}
