//! Service registry module
//!
//! Maps service build identifiers to invocable service handles. The
//! registry is built once at startup from the configured deployment
//! bindings and is read-only for the rest of the process lifetime.

pub mod upstream;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};
use thiserror::Error;

use crate::config::ServiceBinding;
use crate::logger;
use upstream::UpstreamHandle;

/// A deployed service that can accept one forwarded request and produce one
/// response.
///
/// This is the single capability the dispatcher requires of a registry
/// entry. A handle's internal behavior (its own sub-path routing, discovery
/// endpoints, state) is entirely its own responsibility.
#[async_trait]
pub trait ServiceHandle: Send + Sync {
    /// Forward a request to the service and await its response.
    async fn invoke(
        &self,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<Full<Bytes>>, InvokeError>;
}

/// Transport-level failure raised by a service handle instead of a response.
///
/// The `Display` text is the human-readable message surfaced to the caller
/// in the 500 error body.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The forwarded request could not be constructed
    #[error("failed to build upstream request: {0}")]
    Request(#[from] hyper::http::Error),
    /// The upstream connection or exchange failed
    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    /// The upstream response body could not be read
    #[error("failed to read upstream response body: {0}")]
    Body(#[from] hyper::Error),
    /// Any other failure reported by a handle implementation
    #[error("{0}")]
    Other(String),
}

/// Rejected deployment binding at registry construction
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("service binding has an empty key")]
    EmptyKey,
    #[error("duplicate service key '{0}'")]
    DuplicateKey(String),
    #[error("invalid upstream '{upstream}' for service '{key}': {reason}")]
    InvalidUpstream {
        key: String,
        upstream: String,
        reason: String,
    },
}

/// Immutable mapping from service key to service handle
pub struct ServiceRegistry {
    handles: HashMap<String, Arc<dyn ServiceHandle>>,
}

impl ServiceRegistry {
    /// Build the registry from deployment bindings.
    ///
    /// Bindings that do not satisfy the invocation contract are rejected
    /// here rather than discovered at dispatch time: empty keys, duplicate
    /// keys, and unparseable upstreams abort startup. Disabled bindings are
    /// flagged in the log and skipped, so every surviving entry is
    /// invocable.
    pub fn from_bindings(bindings: &[ServiceBinding]) -> Result<Self, RegistryError> {
        let mut handles: HashMap<String, Arc<dyn ServiceHandle>> = HashMap::new();

        for binding in bindings {
            if binding.key.is_empty() {
                return Err(RegistryError::EmptyKey);
            }
            if !binding.enabled {
                logger::log_warning(&format!(
                    "Service '{}' is disabled, binding skipped",
                    binding.key
                ));
                continue;
            }

            let handle = UpstreamHandle::new(&binding.upstream).map_err(|reason| {
                RegistryError::InvalidUpstream {
                    key: binding.key.clone(),
                    upstream: binding.upstream.clone(),
                    reason,
                }
            })?;

            if handles
                .insert(binding.key.clone(), Arc::new(handle))
                .is_some()
            {
                return Err(RegistryError::DuplicateKey(binding.key.clone()));
            }
        }

        Ok(Self { handles })
    }

    /// Build a registry from pre-constructed handles
    #[cfg(test)]
    pub fn from_handles(handles: HashMap<String, Arc<dyn ServiceHandle>>) -> Self {
        Self { handles }
    }

    /// Look up the handle registered for a service key
    pub fn get(&self, key: &str) -> Option<&Arc<dyn ServiceHandle>> {
        self.handles.get(key)
    }

    /// All registered service keys, sorted for deterministic output
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.handles.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
