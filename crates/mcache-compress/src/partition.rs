//! # Size-Balanced Partitioning
//!
//! Balanced multiway partitioning is NP-hard; a greedy approximation is
//! good enough for spreading compression work across threads.
//!
//! Files are taken largest first and each one goes to the package with the
//! smallest running total. Packages are kept sorted ascending by total, so
//! the smallest is always at the front. After an assignment only that one
//! package moves, and it is re-inserted at its new rank with a binary
//! search instead of re-sorting the whole list.

use std::path::PathBuf;

use mcache_core::WorkerBounds;

use crate::scanner::FileInfo;

/// One worker's share of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerPackage {
    /// Sum of the sizes of `files`.
    pub size: u64,
    pub files: Vec<PathBuf>,
}

/// Split `files` into `count` packages of roughly equal total size.
///
/// Every input file ends up in exactly one package. `count` of zero is
/// treated as one. Packages may be empty when there are fewer files than
/// packages.
pub fn partition(mut files: Vec<FileInfo>, count: usize) -> Vec<WorkerPackage> {
    let count = count.max(1);
    files.sort_by(|a, b| b.size.cmp(&a.size));

    let mut packages = vec![WorkerPackage::default(); count];
    for file in files {
        let mut smallest = packages.remove(0);
        smallest.size += file.size;
        smallest.files.push(file.path);

        let rank = packages.partition_point(|p| p.size <= smallest.size);
        packages.insert(rank, smallest);
    }
    packages
}

/// Number of workers for a batch of `total_bytes`.
///
/// One worker per `chunk_size` bytes (rounded), clamped to both the
/// configured maximum and the available hardware parallelism. A result
/// below `bounds.min` means the batch should run on the calling thread.
pub fn worker_count(total_bytes: u64, bounds: &WorkerBounds, parallelism: usize) -> usize {
    let chunk = bounds.chunk_size.max(1);
    let desired = (total_bytes + chunk / 2) / chunk;
    let desired = usize::try_from(desired).unwrap_or(usize::MAX);
    desired.min(bounds.max).min(parallelism.max(1))
}
