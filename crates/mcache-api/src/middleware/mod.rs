//! # Middleware Stack
//!
//! Tower middleware for the delivery service:
//! - [`static_files`]: negotiated static file delivery with fallthrough.
//! - [`conditional`]: `304 Not Modified` for fresh conditional requests.
//! - [`metrics`]: Prometheus-compatible request and variant counters.

pub mod conditional;
pub mod metrics;
pub mod static_files;
