//! # mcache-core: Foundational Types for the Media Cache
//!
//! Every other crate in the workspace depends on `mcache-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Identity is content.** An [`Identity`] is the SHA-256 digest of the
//!    normalized bytes plus the normalized [`MediaType`] token. Identical
//!    content always yields an identical identity.
//!
//! 2. **Names are derived, never looked up.** [`CacheTag::suffix()`] is a fixed
//!    mapping from tag to file suffix, so a physical file name is a pure
//!    function of `(Identity, CacheTag)`. There is no metadata index.
//!
//! 3. **Typed error taxonomy.** [`MediaError`] separates client errors
//!    (bad data, unsupported format, malformed filter argument) from server
//!    errors (I/O, integrity). Absence is modelled as `Option`, not an error.
//!
//! 4. **Explicit configuration.** [`MediaConfig`] enumerates every option with
//!    its default and is validated once at startup.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mcache-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod digest;
pub mod error;
pub mod media;
pub mod resize;
pub mod tag;

// Re-export primary types for ergonomic imports.
pub use config::{MediaConfig, WorkerBounds, BUILTIN_FILTERS};
pub use digest::{sha256_digest, ContentDigest};
pub use error::MediaError;
pub use media::{Identity, MediaType};
pub use resize::ResizeSpec;
pub use tag::{CacheTag, Encoding};
