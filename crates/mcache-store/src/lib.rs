//! # mcache-store: Content-Addressed Media Store
//!
//! A flat directory of immutable files whose names are derived from
//! `(Identity, CacheTag)`:
//!
//! - `<hash>.<type>` for the primary artifact,
//! - `<hash>.<type>.<format>` for format variants,
//! - `.br` / `.gz` appended for encoded variants.
//!
//! Every write is create-if-absent. A second write of the same slot file is
//! a no-op reported as [`WriteOutcome::AlreadyPresent`], which is what makes
//! concurrent duplicate uploads safe without any lock.

pub mod cas;

pub use cas::{write_once, ContentAddressedStore, Slot, WriteOutcome};
