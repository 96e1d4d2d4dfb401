//! Scoped worker pool.
//!
//! Each unit of work runs on its own scoped thread and owns its input
//! exclusively, so no locks are involved. The pool blocks until every
//! worker has finished; the first failure (in worker order) is returned and
//! the whole batch counts as failed.

use std::thread;

use crate::error::CompressError;

/// Runs a fixed set of typed work units in parallel.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: String,
}

impl WorkerPool {
    /// `name` prefixes the worker thread names (`<name>-<index>`).
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Run `work` once per unit, each on its own thread, and collect the
    /// results in unit order.
    pub fn run<U, R, F>(&self, units: Vec<U>, work: F) -> Result<Vec<R>, CompressError>
    where
        U: Send,
        R: Send,
        F: Fn(U) -> Result<R, CompressError> + Sync,
    {
        let work = &work;
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(units.len());
            for (index, unit) in units.into_iter().enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("{}-{index}", self.name))
                    .spawn_scoped(scope, move || work(unit))
                    .map_err(|source| CompressError::Spawn {
                        worker: index,
                        source,
                    })?;
                handles.push(handle);
            }

            let mut results = Vec::with_capacity(handles.len());
            let mut first_error = None;
            for (index, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(result)) => results.push(result),
                    Ok(Err(e)) => {
                        tracing::error!(worker = index, error = %e, "worker failed");
                        first_error.get_or_insert(CompressError::WorkerFailed {
                            worker: index,
                            source: Box::new(e),
                        });
                    }
                    Err(_) => {
                        tracing::error!(worker = index, "worker panicked");
                        first_error.get_or_insert(CompressError::WorkerPanicked(index));
                    }
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(results),
            }
        })
    }
}
