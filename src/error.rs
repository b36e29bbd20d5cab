use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SortError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("range {low}..{high} is out of bounds for a sequence of length {len}")]
    Range { low: usize, high: usize, len: usize },
    #[error("failed to allocate {what} of {len} elements: {source}")]
    Alloc {
        what: &'static str,
        len: usize,
        #[source]
        source: TryReserveError,
    },
    #[error("failed to spawn sort worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("sort worker panicked")]
    WorkerPanicked,
}

pub(crate) fn check_range(len: usize, low: usize, high: usize) -> Result<(), SortError> {
    if low > high || high > len {
        return Err(SortError::Range { low, high, len });
    }
    Ok(())
}
