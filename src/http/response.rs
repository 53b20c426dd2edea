//! HTTP response building module
//!
//! Builders for the dispatcher's synthesized responses. Dispatch errors are
//! JSON bodies with `Content-Type: application/json`; hosting-layer guards
//! (body size, unreadable body) answer in plain text.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// 404 response for a request whose path has no non-empty segment
pub fn build_no_service_response() -> Response<Full<Bytes>> {
    json_error(
        404,
        "No service path specified. Expected: /{service-build-id}/...".to_string(),
    )
}

/// 404 response for an unregistered service key.
///
/// Lists the currently registered keys so a caller can correct the build
/// identifier without consulting the deployment config.
pub fn build_service_not_found_response(key: &str, available: &[&str]) -> Response<Full<Bytes>> {
    json_error(
        404,
        format!("Service '{key}' not found. Available: {}", available.join(", ")),
    )
}

/// 500 response for a handle that failed instead of producing a response
pub fn build_invoke_error_response(key: &str, message: &str) -> Response<Full<Bytes>> {
    json_error(500, format!("Error calling service '{key}': {message}"))
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(400)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("400 Bad Request")))
        .unwrap_or_else(|e| {
            log_build_error(400, &e);
            Response::new(Full::new(Bytes::from("400 Bad Request")))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(413)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("413 Payload Too Large")))
        .unwrap_or_else(|e| {
            log_build_error(413, &e);
            Response::new(Full::new(Bytes::from("413 Payload Too Large")))
        })
}

/// Build a JSON error response with the given status
fn json_error(status: u16, message: String) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::from(
                r#"{"error":"Internal server error"}"#,
            )))
        })
}

/// Log response build error
fn log_build_error(status: u16, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
