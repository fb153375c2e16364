//! Resilience patterns for service clients
//!
//! Only retry with exponential backoff is provided; callers decide whether a
//! request is worth retrying at all (the default policy performs no retries).

mod retry;

pub use retry::{RetryConfig, RetryExecutor};
