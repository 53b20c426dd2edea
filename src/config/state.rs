// Application state module
// Process-wide state shared by all connections

use crate::config::Config;
use crate::registry::ServiceRegistry;

/// Application state
///
/// Built once in `main` and read-only afterwards, so request tasks share it
/// without locking.
pub struct AppState {
    pub config: Config,
    pub registry: ServiceRegistry,
}

impl AppState {
    pub const fn new(config: Config, registry: ServiceRegistry) -> Self {
        Self { config, registry }
    }
}
