//! Core abstractions for the Vision SDK
//!
//! `ServiceClient` is the base trait every client in `services` implements.

use std::collections::HashMap;

/// Base trait for all service clients
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;

    /// Request counters collected so far
    fn metrics(&self) -> HashMap<String, String>;
}
