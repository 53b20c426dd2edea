//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: extracts the service key from
//! the first non-empty path segment, resolves the registered handle,
//! forwards the original request, and relays the response.

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes, Incoming};
use hyper::{Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::logger::AccessLogEntry;
use crate::registry::ServiceRegistry;

/// Main entry point for HTTP request handling
///
/// Buffers the inbound body, hands the request to the dispatcher, and
/// writes the access log line once the outcome is known.
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();

    // Check body size before buffering
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return Ok(resp);
    }

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    // Capture request metadata for the access log before the request is
    // consumed by dispatch
    let mut entry = AccessLogEntry::new(
        remote_addr.to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_str(req.version()).to_string();
    entry.referer = header_str(&req, "referer");
    entry.user_agent = header_str(&req, "user-agent");

    // Buffer the inbound body so the request reaches the resolved service
    // as a single owned value
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => Full::new(collected.to_bytes()),
        Err(e) => {
            logger::log_error(&format!("Failed to read request body: {e}"));
            return Ok(http::build_400_response());
        }
    };
    let req = Request::from_parts(parts, body);

    let (response, service) = dispatch(req, &state.registry).await;

    if state.config.logging.access_log {
        entry.service = service;
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch one request to the service selected by its leading path segment.
///
/// Returns the response together with the resolved service key (when one
/// was extracted) for access logging.
///
/// The request is forwarded to the resolved handle untouched: the
/// service-key segment stays in the path and no suffix receives special
/// treatment, so a service's own discovery or introspection endpoints work
/// without dispatcher cooperation. No timeout or retry happens at this
/// layer.
pub async fn dispatch(
    req: Request<Full<Bytes>>,
    registry: &ServiceRegistry,
) -> (Response<Full<Bytes>>, Option<String>) {
    let path = req.uri().path().to_string();

    // 1. First non-empty segment is the service key; later segments are
    //    part of the forwarded path
    let Some(key) = path
        .split('/')
        .find(|s| !s.is_empty())
        .map(ToString::to_string)
    else {
        logger::log_no_service_path(&path);
        return (http::build_no_service_response(), None);
    };

    // 2. Resolve the handle
    let available = registry.keys();
    logger::log_service_lookup(&path, &key, &available);

    let Some(handle) = registry.get(&key) else {
        logger::log_service_not_found(&key);
        return (
            http::build_service_not_found_response(&key, &available),
            Some(key),
        );
    };

    // 3. Forward the original request and relay the outcome
    match handle.invoke(req).await {
        Ok(resp) => {
            logger::log_dispatch_ok(&key, resp.status().as_u16());
            (resp, Some(key))
        }
        Err(e) => {
            logger::log_invoke_error(&key, &e);
            (
                http::build_invoke_error_response(&key, &e.to_string()),
                Some(key),
            )
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(req: &Request<Incoming>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn version_str(version: Version) -> &'static str {
    if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2"
    } else if version == Version::HTTP_3 {
        "3"
    } else {
        "1.1"
    }
}

fn header_str(req: &Request<Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InvokeError, ServiceHandle};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What a stub handle saw when it was invoked
    #[derive(Debug, Clone)]
    struct SeenRequest {
        method: String,
        path: String,
        query: Option<String>,
        body: Bytes,
        header_x_caller: Option<String>,
    }

    /// Handle that records the request it receives and replies with a
    /// canned response
    struct RecordingHandle {
        seen: Mutex<Vec<SeenRequest>>,
        status: u16,
        body: &'static str,
    }

    impl RecordingHandle {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                status,
                body,
            })
        }
    }

    #[async_trait]
    impl ServiceHandle for RecordingHandle {
        async fn invoke(
            &self,
            req: Request<Full<Bytes>>,
        ) -> Result<Response<Full<Bytes>>, InvokeError> {
            let header_x_caller = req
                .headers()
                .get("x-caller")
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            let (parts, body) = req.into_parts();
            let body = body.collect().await.unwrap().to_bytes();
            self.seen.lock().unwrap().push(SeenRequest {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
                query: parts.uri.query().map(ToString::to_string),
                body,
                header_x_caller,
            });

            Ok(Response::builder()
                .status(self.status)
                .header("X-Upstream", "stub")
                .body(Full::new(Bytes::from(self.body)))
                .unwrap())
        }
    }

    /// Handle that always fails at the transport level
    struct FailingHandle {
        message: &'static str,
    }

    #[async_trait]
    impl ServiceHandle for FailingHandle {
        async fn invoke(
            &self,
            _req: Request<Full<Bytes>>,
        ) -> Result<Response<Full<Bytes>>, InvokeError> {
            Err(InvokeError::Other(self.message.to_string()))
        }
    }

    fn registry_with(entries: Vec<(&str, Arc<dyn ServiceHandle>)>) -> ServiceRegistry {
        let handles: HashMap<String, Arc<dyn ServiceHandle>> = entries
            .into_iter()
            .map(|(k, h)| (k.to_string(), h))
            .collect();
        ServiceRegistry::from_handles(handles)
    }

    fn request(uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn error_text(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_empty_path_variants_rejected() {
        let registry = registry_with(vec![(
            "counter-1.0.0-1234",
            RecordingHandle::new(200, "ok"),
        )]);

        for uri in ["/", "///", "http://example.com"] {
            let (resp, service) = dispatch(request(uri), &registry).await;
            assert_eq!(resp.status(), 404, "uri: {uri}");
            assert!(service.is_none(), "uri: {uri}");
            assert_eq!(
                resp.headers().get("Content-Type").unwrap(),
                "application/json"
            );
            assert_eq!(
                error_text(resp).await,
                "No service path specified. Expected: /{service-build-id}/..."
            );
        }
    }

    #[tokio::test]
    async fn test_forwarded_request_preserved_verbatim() {
        let handle = RecordingHandle::new(200, "7");
        let registry = registry_with(vec![("counter-1.0.0-1234", handle.clone())]);

        let req = Request::builder()
            .method("POST")
            .uri("/counter-1.0.0-1234/invoke/Counter/add?amount=3")
            .header("x-caller", "test-suite")
            .body(Full::new(Bytes::from("{\"value\":3}")))
            .unwrap();

        let (resp, service) = dispatch(req, &registry).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(service.as_deref(), Some("counter-1.0.0-1234"));

        let seen = handle.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        // The leading service-key segment is still present
        assert_eq!(seen[0].path, "/counter-1.0.0-1234/invoke/Counter/add");
        assert_eq!(seen[0].query.as_deref(), Some("amount=3"));
        assert_eq!(seen[0].body, Bytes::from("{\"value\":3}"));
        assert_eq!(seen[0].header_x_caller.as_deref(), Some("test-suite"));
    }

    #[tokio::test]
    async fn test_response_passthrough_unchanged() {
        let handle = RecordingHandle::new(418, "teapot says hi");
        let registry = registry_with(vec![("greeter-1.0.0-1", handle)]);

        let (resp, _) = dispatch(request("/greeter-1.0.0-1/invoke/Greeter/greet"), &registry).await;

        assert_eq!(resp.status(), 418);
        assert_eq!(resp.headers().get("X-Upstream").unwrap(), "stub");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, Bytes::from("teapot says hi"));
    }

    #[tokio::test]
    async fn test_key_only_path_is_dispatched() {
        let handle = RecordingHandle::new(200, "ok");
        let registry = registry_with(vec![("greeter-1.0.0-1", handle.clone())]);

        let (resp, _) = dispatch(request("/greeter-1.0.0-1"), &registry).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(handle.seen.lock().unwrap()[0].path, "/greeter-1.0.0-1");
    }

    #[tokio::test]
    async fn test_duplicate_slashes_keep_forwarded_path() {
        let handle = RecordingHandle::new(200, "ok");
        let registry = registry_with(vec![("greeter-1.0.0-1", handle.clone())]);

        let (resp, _) = dispatch(request("//greeter-1.0.0-1//ping/"), &registry).await;

        assert_eq!(resp.status(), 200);
        // Empty segments select the key but never rewrite the path
        assert_eq!(handle.seen.lock().unwrap()[0].path, "//greeter-1.0.0-1//ping/");
    }

    #[tokio::test]
    async fn test_unknown_key_lists_available() {
        let registry = registry_with(vec![(
            "greeter-1.0.0-1",
            RecordingHandle::new(200, "ok"),
        )]);

        let (resp, service) = dispatch(request("/unknown-9.9.9-1/ping"), &registry).await;

        assert_eq!(resp.status(), 404);
        assert_eq!(service.as_deref(), Some("unknown-9.9.9-1"));
        assert_eq!(
            error_text(resp).await,
            "Service 'unknown-9.9.9-1' not found. Available: greeter-1.0.0-1"
        );
    }

    #[tokio::test]
    async fn test_unknown_key_available_list_sorted() {
        let registry = registry_with(vec![
            ("greeter-1.0.0-1", RecordingHandle::new(200, "ok")),
            ("counter-1.0.0-1234", RecordingHandle::new(200, "ok")),
        ]);

        let (resp, _) = dispatch(request("/unknown-9.9.9-1/ping"), &registry).await;

        let text = error_text(resp).await;
        assert_eq!(
            text,
            "Service 'unknown-9.9.9-1' not found. Available: counter-1.0.0-1234, greeter-1.0.0-1"
        );
        // The requested key never shows up in the available list
        assert_eq!(text.matches("unknown-9.9.9-1").count(), 1);
    }

    #[tokio::test]
    async fn test_empty_registry_lookup_miss() {
        let registry = registry_with(vec![]);

        let (resp, _) = dispatch(request("/counter-1.0.0-1234/ping"), &registry).await;

        assert_eq!(resp.status(), 404);
        assert_eq!(
            error_text(resp).await,
            "Service 'counter-1.0.0-1234' not found. Available: "
        );
    }

    #[tokio::test]
    async fn test_invoke_failure_surfaces_message() {
        let registry = registry_with(vec![(
            "counter-1.0.0-1234",
            Arc::new(FailingHandle {
                message: "connection refused",
            }),
        )]);

        let (resp, service) = dispatch(request("/counter-1.0.0-1234/invoke/Counter/get"), &registry).await;

        assert_eq!(resp.status(), 500);
        assert_eq!(service.as_deref(), Some("counter-1.0.0-1234"));
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "application/json"
        );
        assert_eq!(
            error_text(resp).await,
            "Error calling service 'counter-1.0.0-1234': connection refused"
        );
    }
}
