//! Tracing and metrics set-up shared by the bronze binaries and tests.

pub mod metrics;
pub mod tracing;
