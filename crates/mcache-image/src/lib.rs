//! # mcache-image: Variant Pipeline and Pre-Generation Service
//!
//! Ingests images, derives their delivery variants once at save time, and
//! resolves the best stored variant at read time. Nothing is transcoded on
//! the read path.
//!
//! ## Save
//!
//! 1. The declared type is normalized and checked against the input
//!    allow-list ([`ingest`]).
//! 2. The bytes are inspected; bitmaps are converted to PNG so the identity is
//!    computed on the canonical form.
//! 3. If the primary artifact already exists the save ends here.
//! 4. Otherwise every variant is built concurrently through the
//!    [`FilterRegistry`]. A filter that cannot represent the content yields
//!    [`FilterOutcome::Unhandlable`] and that one variant is skipped; a
//!    [`FilterOutcome::Fatal`] aborts the save before anything is written.
//!
//! SVG documents skip the registry: they are minified losslessly and
//! brotli-encoded only above a size threshold.
//!
//! ## Get
//!
//! [`PreGenerationService::get`] tries cache tags in a fixed preference
//! order and falls back to the primary artifact.

pub mod filter;
pub mod filters;
pub mod ingest;
pub mod service;
pub mod svg;

pub use filter::{FilterOutcome, FilterRegistry, ImageFilter};
pub use ingest::PreparedImage;
pub use service::{variant_plan, PreGenerationService, VariantLocation};
