//! COW header codec.
//!
//! ```text
//! [magic: u64][major: u16][minor: u16][header_size: u16][op_size: u16]
//! [block_size: u32][compression: u32][op_count: u64][op_count_max: u64]
//! [num_merge_ops: u64][sequence_data_count: u64][resume_point_count: u32]
//! [resume_point_max: u32][buffer_size: u32][crc32: u32]
//! ```
//!
//! The CRC32 covers bytes `0..68`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::io::{Read, Write};

use crate::{FormatError, OPERATION_BYTES, RESUME_POINT_MAX};

/// Magic number identifying COW files (ASCII "COWSNAP3").
pub const COW_MAGIC: u64 = u64::from_le_bytes(*b"COWSNAP3");

/// Major format version written by this crate.
pub const COW_MAJOR_VERSION: u16 = 3;

/// Minor format version written by this crate.
pub const COW_MINOR_VERSION: u16 = 0;

/// Allocated size of the header region in bytes.
pub const HEADER_BYTES: u64 = 72;

/// Smallest structurally meaningful header: the prefix up to `op_size`.
pub const HEADER_MIN_BYTES: u64 = 16;

/// Bytes covered by the header checksum.
const CRC_COVERED_BYTES: usize = HEADER_BYTES as usize - 4;

/// In-memory COW header.
///
/// `op_count ≤ op_count_max` holds for every header this crate writes or
/// accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CowHeader {
    pub magic: u64,
    pub major_version: u16,
    pub minor_version: u16,
    /// Number of header bytes written by `finalize`.
    pub header_size: u16,
    /// Size of one operation record.
    pub op_size: u16,
    /// Bytes per logical block. Uniform for the whole file.
    pub block_size: u32,
    /// On-disk code of the compression algorithm.
    pub compression_algorithm: u32,
    /// Number of valid operation records.
    pub op_count: u64,
    /// Capacity of the operation table.
    pub op_count_max: u64,
    pub num_merge_ops: u64,
    pub sequence_data_count: u64,
    pub resume_point_count: u32,
    pub resume_point_max: u32,
    /// Size of the scratch region following the header (0 when absent).
    pub buffer_size: u32,
}

impl CowHeader {
    /// Creates a fresh v3 header with zeroed counters.
    pub fn new(block_size: u32) -> Self {
        Self {
            magic: COW_MAGIC,
            major_version: COW_MAJOR_VERSION,
            minor_version: COW_MINOR_VERSION,
            header_size: HEADER_BYTES as u16,
            op_size: OPERATION_BYTES as u16,
            block_size,
            compression_algorithm: 0,
            op_count: 0,
            op_count_max: 0,
            num_merge_ops: 0,
            sequence_data_count: 0,
            resume_point_count: 0,
            resume_point_max: RESUME_POINT_MAX,
            buffer_size: 0,
        }
    }

    /// Serializes the header, CRC included, into its fixed-size image.
    pub fn to_bytes(&self) -> [u8; HEADER_BYTES as usize] {
        let mut buf = Vec::with_capacity(HEADER_BYTES as usize);
        // Writes into a Vec cannot fail.
        let _ = self.write_fields(&mut buf);

        let mut hasher = Crc32::new();
        hasher.update(&buf[..CRC_COVERED_BYTES]);
        buf.extend_from_slice(&hasher.finalize().to_le_bytes());

        let mut out = [0u8; HEADER_BYTES as usize];
        out.copy_from_slice(&buf);
        out
    }

    fn write_fields<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u64::<LittleEndian>(self.magic)?;
        w.write_u16::<LittleEndian>(self.major_version)?;
        w.write_u16::<LittleEndian>(self.minor_version)?;
        w.write_u16::<LittleEndian>(self.header_size)?;
        w.write_u16::<LittleEndian>(self.op_size)?;
        w.write_u32::<LittleEndian>(self.block_size)?;
        w.write_u32::<LittleEndian>(self.compression_algorithm)?;
        w.write_u64::<LittleEndian>(self.op_count)?;
        w.write_u64::<LittleEndian>(self.op_count_max)?;
        w.write_u64::<LittleEndian>(self.num_merge_ops)?;
        w.write_u64::<LittleEndian>(self.sequence_data_count)?;
        w.write_u32::<LittleEndian>(self.resume_point_count)?;
        w.write_u32::<LittleEndian>(self.resume_point_max)?;
        w.write_u32::<LittleEndian>(self.buffer_size)?;
        Ok(())
    }

    /// Decodes and validates a header image.
    ///
    /// # Errors
    ///
    /// - [`FormatError::BadMagic`] if the magic does not match.
    /// - [`FormatError::UnsupportedVersion`] for any major version other than 3.
    /// - [`FormatError::ChecksumMismatch`] if the CRC does not match.
    /// - [`FormatError::Corrupt`] if a size or counter is out of range.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_BYTES as usize {
            return Err(FormatError::Corrupt(format!(
                "header truncated: {} of {} bytes",
                bytes.len(),
                HEADER_BYTES
            )));
        }

        let mut r = bytes;
        let magic = r.read_u64::<LittleEndian>()?;
        if magic != COW_MAGIC {
            return Err(FormatError::BadMagic(magic));
        }
        let major_version = r.read_u16::<LittleEndian>()?;
        let minor_version = r.read_u16::<LittleEndian>()?;
        if major_version != COW_MAJOR_VERSION {
            return Err(FormatError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let header = CowHeader {
            magic,
            major_version,
            minor_version,
            header_size: r.read_u16::<LittleEndian>()?,
            op_size: r.read_u16::<LittleEndian>()?,
            block_size: r.read_u32::<LittleEndian>()?,
            compression_algorithm: r.read_u32::<LittleEndian>()?,
            op_count: r.read_u64::<LittleEndian>()?,
            op_count_max: r.read_u64::<LittleEndian>()?,
            num_merge_ops: r.read_u64::<LittleEndian>()?,
            sequence_data_count: r.read_u64::<LittleEndian>()?,
            resume_point_count: r.read_u32::<LittleEndian>()?,
            resume_point_max: r.read_u32::<LittleEndian>()?,
            buffer_size: r.read_u32::<LittleEndian>()?,
        };
        let stored = r.read_u32::<LittleEndian>()?;

        let mut hasher = Crc32::new();
        hasher.update(&bytes[..CRC_COVERED_BYTES]);
        let computed = hasher.finalize();
        if stored != computed {
            return Err(FormatError::ChecksumMismatch { stored, computed });
        }

        header.validate()?;
        Ok(header)
    }

    /// Reads a header image from `r` and decodes it.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let mut buf = [0u8; HEADER_BYTES as usize];
        r.read_exact(&mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Checks the structural invariants of the header.
    pub fn validate(&self) -> Result<(), FormatError> {
        let header_size = u64::from(self.header_size);
        if !(HEADER_MIN_BYTES..=HEADER_BYTES).contains(&header_size) {
            return Err(FormatError::Corrupt(format!(
                "header_size {} outside [{}, {}]",
                header_size, HEADER_MIN_BYTES, HEADER_BYTES
            )));
        }
        if u64::from(self.op_size) != OPERATION_BYTES {
            return Err(FormatError::Corrupt(format!(
                "op_size {} (expected {})",
                self.op_size, OPERATION_BYTES
            )));
        }
        if self.block_size == 0 || self.block_size > u32::from(u16::MAX) {
            return Err(FormatError::Corrupt(format!(
                "block_size {} out of range",
                self.block_size
            )));
        }
        if self.op_count > self.op_count_max {
            return Err(FormatError::Corrupt(format!(
                "op_count {} exceeds op_count_max {}",
                self.op_count, self.op_count_max
            )));
        }
        if self.resume_point_count > self.resume_point_max {
            return Err(FormatError::Corrupt(format!(
                "resume_point_count {} exceeds resume_point_max {}",
                self.resume_point_count, self.resume_point_max
            )));
        }
        Ok(())
    }
}
