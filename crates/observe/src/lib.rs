//! Logging setup shared by the deployment binaries.
pub mod tracing;
