//! Unit tests for the Vision SDK
//!
//! Service clients are exercised against WireMock servers.

pub mod config_tests;
