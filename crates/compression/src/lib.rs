//! # Compression - Per-Block Payload Compression
//!
//! Wraps the block compressors a COW file may use behind one capability:
//! [`Compressor::compress`] turns one logical block into a (hopefully)
//! smaller byte sequence. The COW writer decides whether to keep the result.
//!
//! | Algorithm | Code | Crate      | Default level |
//! |-----------|------|------------|---------------|
//! | `none`    | 0    | -          | -             |
//! | `gz`      | 1    | `flate2`   | 9             |
//! | `lz4`     | 2    | `lz4_flex` | ignored       |
//! | `zstd`    | 3    | `zstd`     | 3             |
//! | `brotli`  | 4    | `brotli`   | 11            |
//!
//! The code is what gets recorded in the COW header, so it must never be
//! renumbered.

mod compressor;
mod pool;

pub use compressor::{create, decompress, Compressor};
pub use pool::CompressionPool;

use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced by compression setup or by a compressor.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// The algorithm name is not one of the supported set.
    #[error("unrecognized compression: {0:?}")]
    UnknownAlgorithm(String),

    /// The level is outside the range the algorithm accepts.
    #[error("invalid {algorithm} compression level {level}")]
    InvalidLevel {
        algorithm: CompressionAlgorithm,
        level: u32,
    },

    /// The worker pool could not be built.
    #[error("failed to build compression pool: {0}")]
    Pool(String),

    /// Compressing or decompressing a block failed.
    #[error("{algorithm} codec error: {source}")]
    Codec {
        algorithm: CompressionAlgorithm,
        #[source]
        source: io::Error,
    },
}

/// The block compression algorithm recorded in a COW header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionAlgorithm {
    #[default]
    None,
    Gz,
    Lz4,
    Zstd,
    Brotli,
}

impl CompressionAlgorithm {
    /// Stable on-disk code.
    pub fn code(self) -> u32 {
        match self {
            CompressionAlgorithm::None => 0,
            CompressionAlgorithm::Gz => 1,
            CompressionAlgorithm::Lz4 => 2,
            CompressionAlgorithm::Zstd => 3,
            CompressionAlgorithm::Brotli => 4,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(CompressionAlgorithm::None),
            1 => Some(CompressionAlgorithm::Gz),
            2 => Some(CompressionAlgorithm::Lz4),
            3 => Some(CompressionAlgorithm::Zstd),
            4 => Some(CompressionAlgorithm::Brotli),
            _ => None,
        }
    }

    /// Level used when the compression spec does not name one.
    pub fn default_level(self) -> u32 {
        match self {
            CompressionAlgorithm::None | CompressionAlgorithm::Lz4 => 0,
            CompressionAlgorithm::Gz => 9,
            CompressionAlgorithm::Zstd => 3,
            CompressionAlgorithm::Brotli => 11,
        }
    }

    /// Checks that `level` is accepted by this algorithm.
    ///
    /// `none` and `lz4` ignore the level, so any value passes.
    pub fn validate_level(self, level: u32) -> Result<(), CompressionError> {
        let ok = match self {
            CompressionAlgorithm::None | CompressionAlgorithm::Lz4 => true,
            CompressionAlgorithm::Gz => level <= 9,
            CompressionAlgorithm::Zstd => (1..=22).contains(&level),
            CompressionAlgorithm::Brotli => level <= 11,
        };
        if ok {
            Ok(())
        } else {
            Err(CompressionError::InvalidLevel {
                algorithm: self,
                level,
            })
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(CompressionAlgorithm::None),
            "gz" => Ok(CompressionAlgorithm::Gz),
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            "brotli" => Ok(CompressionAlgorithm::Brotli),
            other => Err(CompressionError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionAlgorithm::None => "none",
            CompressionAlgorithm::Gz => "gz",
            CompressionAlgorithm::Lz4 => "lz4",
            CompressionAlgorithm::Zstd => "zstd",
            CompressionAlgorithm::Brotli => "brotli",
        };
        f.write_str(name)
    }
}
