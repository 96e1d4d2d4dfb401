//! # API Route Modules
//!
//! - `image`: upload and negotiated download of content-addressed images.
//! - `video`: write-once video upload and range-capable download.
//! - `health`: liveness and readiness checks.
//! - `fixed_file`: a single file at a fixed URL path.

pub mod fixed_file;
pub mod health;
pub mod image;
pub mod video;

pub use fixed_file::fixed_file;
