//! # Config - COW Writer Options
//!
//! The configuration surface of the COW writer and the parser for the
//! `"<algorithm>[,<level>]"` compression spec.
//!
//! ## Environment
//!
//! [`CowOptions::from_env`] reads:
//!
//! ```text
//! COW_BLOCK_SIZE        bytes per block              (default: 4096)
//! COW_COMPRESSION       "<algorithm>[,<level>]"      (default: "none")
//! COW_OP_COUNT_MAX      operation table capacity     (default: 0)
//! COW_COMPRESS_THREADS  compression workers          (default: 1)
//! COW_SCRATCH_SPACE     reserve the scratch region   (default: "false")
//! ```
//!
//! Unparseable values fall back to the default.

use compression::{CompressionAlgorithm, CompressionError};
use format::DEFAULT_BLOCK_SIZE;
use std::str::FromStr;
use thiserror::Error;

/// Errors in the writer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The compression spec is malformed or names an unsupported algorithm.
    #[error("invalid compression spec {spec:?}: {reason}")]
    Compression { spec: String, reason: String },

    /// The block size cannot be represented on disk.
    #[error("block size {0} must be in 1..=65535")]
    BlockSize(u32),
}

/// Parsed compression settings. Immutable for the lifetime of a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    pub algorithm: CompressionAlgorithm,
    pub level: u32,
    /// Compression workers, always at least 1.
    pub threads: usize,
}

impl CompressionConfig {
    /// Parses `"<algorithm>[,<level>]"`.
    ///
    /// Without a level the algorithm's default level is used.
    ///
    /// # Errors
    ///
    /// More than two comma-separated parts, an unknown algorithm, or a level
    /// that is not an unsigned integer in the algorithm's range.
    pub fn parse(spec: &str, threads: usize) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Compression {
            spec: spec.to_string(),
            reason,
        };

        let parts: Vec<&str> = spec.split(',').collect();
        if parts.len() > 2 {
            return Err(invalid(format!(
                "invalid argument count: {}",
                parts.len()
            )));
        }

        let algorithm: CompressionAlgorithm = parts[0]
            .parse()
            .map_err(|e: CompressionError| invalid(e.to_string()))?;

        let level = match parts.get(1) {
            Some(raw) => {
                let level: u32 = raw
                    .parse()
                    .map_err(|_| invalid(format!("invalid compression level: {:?}", raw)))?;
                algorithm
                    .validate_level(level)
                    .map_err(|e| invalid(e.to_string()))?;
                level
            }
            None => algorithm.default_level(),
        };

        Ok(Self {
            algorithm,
            level,
            threads: threads.max(1),
        })
    }
}

/// Options a COW writer is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CowOptions {
    /// Bytes per logical block, at most `u16::MAX`.
    pub block_size: u32,
    /// Compression spec, `"<algorithm>[,<level>]"`.
    pub compression: String,
    /// Initial operation table capacity. Estimation grows it; write mode
    /// treats it as a hard ceiling.
    pub op_count_max: u64,
    /// Compression workers.
    pub num_compress_threads: usize,
    /// Reserve and zero the scratch region after the header.
    pub scratch_space: bool,
    /// Recorded in the header for the consumer; not interpreted here.
    pub num_merge_ops: u64,
}

impl Default for CowOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            compression: "none".to_string(),
            op_count_max: 0,
            num_compress_threads: 1,
            scratch_space: false,
            num_merge_ops: 0,
        }
    }
}

impl CowOptions {
    /// Loads options from `COW_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads options through `lookup`, falling back to defaults for missing
    /// or unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            block_size: parse_or(lookup("COW_BLOCK_SIZE"), d.block_size),
            compression: lookup("COW_COMPRESSION").unwrap_or(d.compression),
            op_count_max: parse_or(lookup("COW_OP_COUNT_MAX"), d.op_count_max),
            num_compress_threads: parse_or(
                lookup("COW_COMPRESS_THREADS"),
                d.num_compress_threads,
            ),
            scratch_space: parse_or(lookup("COW_SCRATCH_SPACE"), d.scratch_space),
            num_merge_ops: d.num_merge_ops,
        }
    }

    /// Checks the block size and parses the compression spec.
    pub fn validate(&self) -> Result<CompressionConfig, ConfigError> {
        if self.block_size == 0 || self.block_size > u32::from(u16::MAX) {
            return Err(ConfigError::BlockSize(self.block_size));
        }
        CompressionConfig::parse(&self.compression, self.num_compress_threads)
    }
}

/// Parses `value`, falling back to `default` when missing or malformed.
fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
