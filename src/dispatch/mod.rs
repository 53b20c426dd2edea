//! Request dispatch module
//!
//! Routes each inbound request to the deployed service selected by the
//! leading path segment and relays the service's response.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
