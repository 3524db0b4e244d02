//! Run configuration for the coordinator.

use crate::error::{Error, Result};
use std::num::NonZeroUsize;

/// Worker pool sizing for compress and decompress runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Number of workers (coordinator included) used when compressing
    pub workers: usize,
    /// Number of workers used when decompressing; `None` reuses `workers`
    pub decode_workers: Option<usize>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self {
            workers,
            decode_workers: None,
        }
    }
}

impl CodecConfig {
    /// Creates a configuration with a fixed pool of `workers`.
    ///
    /// # Returns
    ///
    /// An error if `workers` is zero
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidInput(
                "Worker count must be positive".to_string(),
            ));
        }
        Ok(Self {
            workers,
            decode_workers: None,
        })
    }

    /// Uses a differently sized pool for decompression.
    pub fn with_decode_workers(mut self, decode_workers: usize) -> Result<Self> {
        if decode_workers == 0 {
            return Err(Error::InvalidInput(
                "Decode worker count must be positive".to_string(),
            ));
        }
        self.decode_workers = Some(decode_workers);
        Ok(self)
    }

    /// Pool size for the decode side.
    pub fn decode_workers(&self) -> usize {
        self.decode_workers.unwrap_or(self.workers)
    }
}
