//! HTTP protocol layer module
//!
//! Response construction shared by the dispatcher and the hosting server,
//! decoupled from dispatch logic.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_400_response, build_413_response, build_invoke_error_response,
    build_no_service_response, build_service_not_found_response,
};
