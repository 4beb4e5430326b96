use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

use crate::{CompressionAlgorithm, CompressionError};

/// A block compressor.
///
/// Implementations are stateless between calls so one instance can be
/// shared by every worker of a [`CompressionPool`](crate::CompressionPool).
pub trait Compressor: Send + Sync {
    /// The algorithm this compressor implements.
    fn algorithm(&self) -> CompressionAlgorithm;

    /// Compresses one block. The output may be larger than the input.
    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// Creates a compressor for `algorithm`.
///
/// Returns `None` for [`CompressionAlgorithm::None`], which has no
/// compressor. `block_size` sizes output buffers.
pub fn create(
    algorithm: CompressionAlgorithm,
    level: u32,
    block_size: u32,
) -> Option<Box<dyn Compressor>> {
    let block_size = block_size as usize;
    match algorithm {
        CompressionAlgorithm::None => None,
        CompressionAlgorithm::Gz => Some(Box::new(GzCompressor { level, block_size })),
        CompressionAlgorithm::Lz4 => Some(Box::new(Lz4Compressor)),
        CompressionAlgorithm::Zstd => Some(Box::new(ZstdCompressor {
            level: level as i32,
        })),
        CompressionAlgorithm::Brotli => Some(Box::new(BrotliCompressor { level, block_size })),
    }
}

/// Inverse of [`Compressor::compress`] for a payload that decodes to at most
/// `block_size` bytes.
pub fn decompress(
    algorithm: CompressionAlgorithm,
    data: &[u8],
    block_size: u32,
) -> Result<Vec<u8>, CompressionError> {
    let codec = |source: io::Error| CompressionError::Codec { algorithm, source };
    let block_size = block_size as usize;
    match algorithm {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Gz => {
            let mut out = Vec::with_capacity(block_size);
            ZlibDecoder::new(data).read_to_end(&mut out).map_err(codec)?;
            Ok(out)
        }
        CompressionAlgorithm::Lz4 => lz4_flex::block::decompress(data, block_size)
            .map_err(|e| codec(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))),
        CompressionAlgorithm::Zstd => zstd::bulk::decompress(data, block_size).map_err(codec),
        CompressionAlgorithm::Brotli => {
            let mut out = Vec::with_capacity(block_size);
            brotli::Decompressor::new(data, BROTLI_BUFFER_BYTES)
                .read_to_end(&mut out)
                .map_err(codec)?;
            Ok(out)
        }
    }
}

/// Internal buffer of the brotli stream adapters.
const BROTLI_BUFFER_BYTES: usize = 4096;
/// log2 of the brotli sliding window.
const BROTLI_WINDOW_BITS: u32 = 22;

/// zlib-wrapped deflate.
struct GzCompressor {
    level: u32,
    block_size: usize,
}

impl Compressor for GzCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Gz
    }

    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let codec = |source| CompressionError::Codec {
            algorithm: CompressionAlgorithm::Gz,
            source,
        };
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(self.block_size),
            Compression::new(self.level),
        );
        encoder.write_all(block).map_err(codec)?;
        encoder.finish().map_err(codec)
    }
}

struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Lz4
    }

    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(lz4_flex::block::compress(block))
    }
}

struct ZstdCompressor {
    level: i32,
}

impl Compressor for ZstdCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Zstd
    }

    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CompressionError> {
        zstd::bulk::compress(block, self.level).map_err(|source| CompressionError::Codec {
            algorithm: CompressionAlgorithm::Zstd,
            source,
        })
    }
}

struct BrotliCompressor {
    level: u32,
    block_size: usize,
}

impl Compressor for BrotliCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Brotli
    }

    fn compress(&self, block: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut writer = brotli::CompressorWriter::new(
            Vec::with_capacity(self.block_size),
            BROTLI_BUFFER_BYTES,
            self.level,
            BROTLI_WINDOW_BITS,
        );
        writer
            .write_all(block)
            .map_err(|source| CompressionError::Codec {
                algorithm: CompressionAlgorithm::Brotli,
                source,
            })?;
        Ok(writer.into_inner())
    }
}
