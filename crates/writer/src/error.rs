use compression::CompressionError;
use config::ConfigError;
use format::FormatError;
use parser::ParseError;
use std::io;
use thiserror::Error;

/// Errors returned by [`CowWriter`](crate::CowWriter).
///
/// Every error leaves the writer's counters either untouched or matching
/// what is durably on disk.
#[derive(Debug, Error)]
pub enum CowError {
    /// Invalid options. Fatal to initialization.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The operation table is full. Re-run estimation with a larger ceiling.
    #[error(
        "current op count {op_count}, attempting to write {requested} ops \
         will exceed the max of {op_count_max}"
    )]
    Capacity {
        op_count: u64,
        requested: u64,
        op_count_max: u64,
    },

    /// An underlying I/O error. Nothing is retried.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The existing file could not be resumed.
    #[error("recovery failed: {0}")]
    Recovery(#[from] ParseError),

    /// The caller violated an API contract.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Format(#[from] FormatError),
}
