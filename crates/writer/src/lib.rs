//! # Writer - COW Snapshot Writer
//!
//! Encodes block-level delta operations into a single seekable COW file
//! (layout documented in the [`format`] crate).
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                 COW WRITER                    │
//! │                                               │
//! │ open.rs  → fresh header / append recovery     │
//! │              |                                │
//! │ emit.rs  → copy / raw / xor / zero blocks     │
//! │              |  (compression pool)            │
//! │              v                                │
//! │ batch.rs → write_operation (single choke      │
//! │            point for op_count, next_data_pos) │
//! │                                               │
//! │ emit.rs  → label → resume.rs → finalize       │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Modes
//!
//! A writer built with [`CowWriter::for_estimation`] has no storage. Every
//! emit call only advances counters, growing `op_count_max` as needed, so
//! the caller learns how large the operation table must be before a single
//! byte is written. [`CowWriter::into_writer`] then hands that capacity to
//! a write-mode writer, where `op_count_max` is a hard ceiling. The
//! transition is one-way.
//!
//! ## Crash Safety
//!
//! Only labels are recovery barriers. `emit_label` persists the resume table
//! and then rewrites and syncs the header, so a crash at any later point can
//! be resumed with [`CowWriter::initialize`]`(Some(label))`. Operations
//! written after the last label are discarded on resume.

mod batch;
mod emit;
mod error;
mod open;
mod resume;

pub use error::CowError;
pub use resume::ResumePoints;

use compression::{CompressionAlgorithm, CompressionPool};
use config::{CompressionConfig, CowOptions};
use format::{CowHeader, CowStorage, ResumePoint, BUFFER_REGION_DEFAULT_SIZE};
use std::fs::File;

/// Convenience alias for an estimation-mode writer. The storage type is
/// never used.
pub type CowEstimator = CowWriter<File>;

/// The COW file writer.
///
/// # Write Path
///
/// 1. Split the caller's data into whole blocks.
/// 2. Compress each block on the pool (if configured); keep the compressed
///    bytes only when they are strictly smaller than the block.
/// 3. Persist operation records and payloads through `write_operation`,
///    which alone advances `op_count` and `next_data_pos`.
///
/// # Invariants
///
/// - `op_count ≤ op_count_max` in write mode.
/// - `next_data_pos` equals the data region start plus every committed
///   payload length.
/// - Failed calls leave the counters where they were.
pub struct CowWriter<S: CowStorage> {
    pub(crate) options: CowOptions,
    pub(crate) compression: CompressionConfig,
    pub(crate) compressor: Option<CompressionPool>,
    pub(crate) header: CowHeader,
    /// `None` while estimating.
    pub(crate) storage: Option<S>,
    pub(crate) resume_points: ResumePoints,
    pub(crate) next_data_pos: u64,
    /// Label an append open resolved to.
    pub(crate) resumed_label: Option<u64>,
    pub(crate) initialized: bool,
}

impl<S: CowStorage> std::fmt::Debug for CowWriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CowWriter")
            .field("estimating", &self.is_estimating())
            .field("block_size", &self.header.block_size)
            .field("compression", &self.compression.algorithm)
            .field("op_count", &self.header.op_count)
            .field("op_count_max", &self.header.op_count_max)
            .field("next_data_pos", &self.next_data_pos)
            .field("resume_points", &self.resume_points.len())
            .finish()
    }
}

impl<S: CowStorage> CowWriter<S> {
    /// Creates a write-mode writer over `storage`.
    ///
    /// Options are validated here; nothing is written until
    /// [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// [`CowError::Config`] for an invalid block size or compression spec,
    /// [`CowError::Compression`] if the worker pool cannot be built.
    pub fn new(options: CowOptions, storage: S) -> Result<Self, CowError> {
        Self::build(options, Some(storage))
    }

    /// Creates an estimation-mode writer. See the crate docs.
    pub fn for_estimation(options: CowOptions) -> Result<Self, CowError> {
        Self::build(options, None)
    }

    fn build(options: CowOptions, storage: Option<S>) -> Result<Self, CowError> {
        let compression = options.validate()?;

        let compressor = match compression::create(
            compression.algorithm,
            compression.level,
            options.block_size,
        ) {
            Some(c) => Some(CompressionPool::new(c, compression.threads)?),
            None => None,
        };

        let mut header = CowHeader::new(options.block_size);
        header.compression_algorithm = compression.algorithm.code();
        header.op_count_max = options.op_count_max;
        header.num_merge_ops = options.num_merge_ops;
        if options.scratch_space {
            header.buffer_size = BUFFER_REGION_DEFAULT_SIZE;
        }
        let resume_points = ResumePoints::new(header.resume_point_max as usize);

        Ok(Self {
            options,
            compression,
            compressor,
            header,
            storage,
            resume_points,
            next_data_pos: 0,
            resumed_label: None,
            initialized: false,
        })
    }

    /// Ends an estimation pass and returns an uninitialized write-mode
    /// writer whose operation table holds exactly what was estimated.
    ///
    /// # Errors
    ///
    /// [`CowError::InvalidInput`] if `self` is not estimating.
    pub fn into_writer<T: CowStorage>(self, storage: T) -> Result<CowWriter<T>, CowError> {
        if !self.is_estimating() {
            return Err(CowError::InvalidInput(
                "into_writer called on a write-mode writer".to_string(),
            ));
        }
        let mut options = self.options;
        options.op_count_max = self.header.op_count_max;
        CowWriter::new(options, storage)
    }

    /// `true` while no storage is attached.
    #[must_use]
    pub fn is_estimating(&self) -> bool {
        self.storage.is_none()
    }

    /// Current end of the data region. In estimation mode this is the size
    /// the finished file will need.
    #[must_use]
    pub fn get_cow_size(&self) -> u64 {
        self.next_data_pos
    }

    /// The in-memory header.
    #[must_use]
    pub fn header(&self) -> &CowHeader {
        &self.header
    }

    /// Number of operations written (or counted) so far.
    #[must_use]
    pub fn op_count(&self) -> u64 {
        self.header.op_count
    }

    /// Capacity of the operation table.
    #[must_use]
    pub fn op_count_max(&self) -> u64 {
        self.header.op_count_max
    }

    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.header.block_size
    }

    #[must_use]
    pub fn compression(&self) -> CompressionAlgorithm {
        self.compression.algorithm
    }

    /// Resume points in insertion order.
    #[must_use]
    pub fn resume_points(&self) -> &[ResumePoint] {
        self.resume_points.as_slice()
    }

    /// The label an append open resumed at. It can be older than the label
    /// asked for when that exact label was never recorded.
    #[must_use]
    pub fn resumed_label(&self) -> Option<u64> {
        self.resumed_label
    }

    /// The attached storage, `None` while estimating.
    pub fn storage_mut(&mut self) -> Option<&mut S> {
        self.storage.as_mut()
    }

    /// Consumes the writer and returns its storage without finalizing.
    pub fn into_storage(self) -> Option<S> {
        self.storage
    }

    pub(crate) fn ensure_initialized(&self) -> Result<(), CowError> {
        if self.initialized {
            Ok(())
        } else {
            Err(CowError::InvalidInput("writer is not initialized".to_string()))
        }
    }
}

#[cfg(test)]
mod tests;
