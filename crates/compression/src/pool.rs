use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::{CompressionError, Compressor};

/// Compresses the blocks of one batch, concurrently when more than one
/// thread is configured.
///
/// Only compression runs on the workers. Results come back in block order
/// so the caller can persist them sequentially.
pub struct CompressionPool {
    compressor: Box<dyn Compressor>,
    pool: Option<ThreadPool>,
}

impl CompressionPool {
    /// Wraps `compressor` with a pool of `threads` workers.
    ///
    /// With `threads <= 1` no pool is built and blocks are compressed on the
    /// calling thread.
    pub fn new(compressor: Box<dyn Compressor>, threads: usize) -> Result<Self, CompressionError> {
        let pool = if threads > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("cow-compress-{}", i))
                .build()
                .map_err(|e| CompressionError::Pool(e.to_string()))?;
            debug!(threads, algorithm = %compressor.algorithm(), "compression pool started");
            Some(pool)
        } else {
            None
        };
        Ok(Self { compressor, pool })
    }

    /// The wrapped compressor.
    pub fn compressor(&self) -> &dyn Compressor {
        self.compressor.as_ref()
    }

    /// Number of worker threads (1 when compressing inline).
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map(|p| p.current_num_threads())
            .unwrap_or(1)
    }

    /// Compresses every whole `block_size` chunk of `data`, in order.
    ///
    /// Trailing bytes that do not fill a block are ignored; the caller is
    /// expected to have rejected them already.
    pub fn compress_blocks(
        &self,
        data: &[u8],
        block_size: usize,
    ) -> Result<Vec<Vec<u8>>, CompressionError> {
        let compressor = self.compressor.as_ref();
        match &self.pool {
            Some(pool) => pool.install(|| {
                data.par_chunks_exact(block_size)
                    .map(|block| compressor.compress(block))
                    .collect()
            }),
            None => data
                .chunks_exact(block_size)
                .map(|block| compressor.compress(block))
                .collect(),
        }
    }
}
