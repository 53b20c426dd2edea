// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    /// Deployment bindings the service registry is built from
    #[serde(default)]
    pub services: Vec<ServiceBinding>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub show_headers: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub max_body_size: u64,
}

/// One deployment binding: a service build identifier and the upstream that
/// serves it.
///
/// The key is the full build identifier (e.g. `counter-1.0.0-1234`) and is
/// treated as an opaque string; its internal structure is never parsed.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServiceBinding {
    /// Routing key: the leading path segment that selects this service
    pub key: String,
    /// Upstream origin requests are forwarded to (e.g. "http://127.0.0.1:9081")
    pub upstream: String,
    /// Disabled bindings are flagged and skipped at registry construction
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}
