//! Upstream service handle
//!
//! The production `ServiceHandle`: forwards the original request to the
//! bound upstream origin over HTTP and relays the buffered response.

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::http::uri::{Authority, Parts, PathAndQuery, Scheme, Uri};
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use super::{InvokeError, ServiceHandle};

/// Forwards requests to a fixed upstream origin.
///
/// Only scheme and authority are rewritten; the path (including the leading
/// service-key segment) and query reach the upstream untouched.
pub struct UpstreamHandle {
    client: Client<HttpConnector, Full<Bytes>>,
    scheme: Scheme,
    authority: Authority,
}

impl UpstreamHandle {
    /// Create a handle for an upstream origin such as "http://127.0.0.1:9081".
    ///
    /// Returns a human-readable reason when the origin cannot be used.
    pub fn new(upstream: &str) -> Result<Self, String> {
        let uri: Uri = upstream.parse().map_err(|e| format!("{e}"))?;

        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| "missing scheme".to_string())?;
        if scheme != Scheme::HTTP {
            return Err(format!("unsupported scheme '{scheme}'"));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| "missing host".to_string())?;

        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            scheme,
            authority,
        })
    }

    /// Swap in the upstream scheme and authority, keeping path and query
    fn upstream_uri(&self, original: &Uri) -> Result<Uri, hyper::http::Error> {
        let mut parts = Parts::default();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        parts.path_and_query = Some(
            original
                .path_and_query()
                .cloned()
                .unwrap_or_else(|| PathAndQuery::from_static("/")),
        );
        Uri::from_parts(parts).map_err(hyper::http::Error::from)
    }
}

#[async_trait]
impl ServiceHandle for UpstreamHandle {
    async fn invoke(
        &self,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<Full<Bytes>>, InvokeError> {
        let (mut parts, body) = req.into_parts();
        parts.uri = self.upstream_uri(&parts.uri)?;
        let upstream_req = Request::from_parts(parts, body);

        let resp = self.client.request(upstream_req).await?;

        // Buffer the upstream body so the response can be relayed as one
        // owned value; status, version, and headers pass through unchanged
        let (parts, body) = resp.into_parts();
        let bytes = body.collect().await?.to_bytes();
        Ok(Response::from_parts(parts, Full::new(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_http_origin() {
        assert!(UpstreamHandle::new("http://127.0.0.1:9081").is_ok());
        assert!(UpstreamHandle::new("http://counter.internal").is_ok());
    }

    #[test]
    fn test_new_rejects_malformed_upstream() {
        assert!(UpstreamHandle::new("not a url").is_err());
        assert!(UpstreamHandle::new("127.0.0.1:9081").is_err());
        assert!(UpstreamHandle::new("ftp://127.0.0.1").is_err());
    }

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let handle = UpstreamHandle::new("http://127.0.0.1:9081").unwrap();
        let original: Uri = "/counter-1.0.0-1234/invoke/Counter/get?verbose=1"
            .parse()
            .unwrap();

        let rewritten = handle.upstream_uri(&original).unwrap();
        assert_eq!(rewritten.host(), Some("127.0.0.1"));
        assert_eq!(rewritten.port_u16(), Some(9081));
        assert_eq!(rewritten.path(), "/counter-1.0.0-1234/invoke/Counter/get");
        assert_eq!(rewritten.query(), Some("verbose=1"));
    }

    #[test]
    fn test_upstream_uri_defaults_empty_path() {
        let handle = UpstreamHandle::new("http://127.0.0.1:9081").unwrap();
        let original = Uri::from_static("http://example.com");

        let rewritten = handle.upstream_uri(&original).unwrap();
        assert_eq!(rewritten.path(), "/");
    }
}
