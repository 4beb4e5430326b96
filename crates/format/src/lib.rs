//! # Format - COW Snapshot File Layout
//!
//! On-disk types shared by the COW writer and the recovery parser.
//!
//! A COW file records how a target partition differs from its source as a
//! sequence of block-level operations. The file is written with positioned
//! writes into fixed regions whose offsets are derived from the header alone
//! (see [`layout`]).
//!
//! ## File layout (v3)
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ HEADER (72 bytes, offset 0)                                   │
//! │                                                               │
//! │ magic (u64) | major (u16) | minor (u16) | header_size (u16)   │
//! │ op_size (u16) | block_size (u32) | compression (u32)          │
//! │ op_count (u64) | op_count_max (u64) | num_merge_ops (u64)     │
//! │ sequence_data_count (u64) | resume_point_count (u32)          │
//! │ resume_point_max (u32) | buffer_size (u32) | crc32 (u32)      │
//! ├───────────────────────────────────────────────────────────────┤
//! │ SCRATCH BUFFER (buffer_size bytes, optional, zero-filled)     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ SEQUENCE DATA (sequence_data_count × u32)                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ RESUME TABLE (resume_point_max × 16 bytes)                    │
//! │                                                               │
//! │ label (u64) | op_index (u64)                                  │
//! ├───────────────────────────────────────────────────────────────┤
//! │ OPERATION TABLE (op_count_max × 24 bytes)                     │
//! │                                                               │
//! │ type (u8) | reserved (u8) | data_length (u16)                 │
//! │ reserved (u32) | new_block (u64) | source (u64)               │
//! ├───────────────────────────────────────────────────────────────┤
//! │ DATA (payloads appended in operation order)                   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The header CRC32 covers every header
//! byte before it, so a torn header rewrite is detected on open.

mod header;
pub mod layout;
mod operation;
mod resume;
mod storage;

pub use header::{
    CowHeader, COW_MAGIC, COW_MAJOR_VERSION, COW_MINOR_VERSION, HEADER_BYTES, HEADER_MIN_BYTES,
};
pub use operation::{CowOperation, OpType, OPERATION_BYTES};
pub use resume::{ResumePoint, RESUME_POINT_BYTES};
pub use storage::CowStorage;

use std::io;
use thiserror::Error;

/// Default bytes per logical block.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Number of resume points kept in the resume table.
pub const RESUME_POINT_MAX: u32 = 4;

/// Size of the optional scratch region reserved after the header (2 MiB).
pub const BUFFER_REGION_DEFAULT_SIZE: u32 = 2 * 1024 * 1024;

/// Size of one sequence-data entry in bytes.
pub const SEQUENCE_ENTRY_BYTES: u64 = 4;

/// Errors raised while decoding on-disk structures.
#[derive(Debug, Error)]
pub enum FormatError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The header does not start with [`COW_MAGIC`].
    #[error("bad magic: {0:#x}")]
    BadMagic(u64),

    /// The header declares a version this crate cannot read.
    #[error("unsupported version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    /// The header CRC does not match its contents.
    #[error("header checksum mismatch (stored {stored:#x}, computed {computed:#x})")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// A structurally invalid field.
    #[error("corrupt: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests;
