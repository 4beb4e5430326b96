//! Fixed-size operation records.
//!
//! ```text
//! [type: u8][reserved: u8][data_length: u16][reserved: u32][new_block: u64][source: u64]
//! ```
//!
//! The meaning of `source` depends on the type: a source block index for
//! Copy, a byte offset into the source image for Xor, the payload offset for
//! Replace, and the label value for Label. Zero leaves it unused.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::FormatError;

/// Size of one encoded operation record in bytes.
pub const OPERATION_BYTES: u64 = 24;

/// On-disk operation type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpType {
    Copy = 1,
    Replace = 2,
    Zero = 3,
    Label = 4,
    Xor = 5,
}

impl OpType {
    /// Maps a raw tag to its type, or `None` for an unknown tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(OpType::Copy),
            2 => Some(OpType::Replace),
            3 => Some(OpType::Zero),
            4 => Some(OpType::Label),
            5 => Some(OpType::Xor),
            _ => None,
        }
    }
}

/// A single COW operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CowOperation {
    /// `new_block` takes the contents of `source_block` from the source image.
    Copy { new_block: u64, source_block: u64 },
    /// `new_block` is replaced by the payload stored at `data_offset`.
    Replace {
        new_block: u64,
        data_offset: u64,
        data_length: u16,
    },
    /// `new_block` is the payload XORed with the source image at `source_offset`.
    Xor {
        new_block: u64,
        source_offset: u64,
        data_length: u16,
    },
    /// `new_block` is filled with zeroes.
    Zero { new_block: u64 },
    /// A checkpoint marker.
    Label { label: u64 },
}

impl CowOperation {
    /// Returns the type tag of this operation.
    pub fn op_type(&self) -> OpType {
        match self {
            CowOperation::Copy { .. } => OpType::Copy,
            CowOperation::Replace { .. } => OpType::Replace,
            CowOperation::Xor { .. } => OpType::Xor,
            CowOperation::Zero { .. } => OpType::Zero,
            CowOperation::Label { .. } => OpType::Label,
        }
    }

    /// Destination block, for every type except Label.
    #[must_use]
    pub fn new_block(&self) -> Option<u64> {
        match self {
            CowOperation::Copy { new_block, .. }
            | CowOperation::Replace { new_block, .. }
            | CowOperation::Xor { new_block, .. }
            | CowOperation::Zero { new_block } => Some(*new_block),
            CowOperation::Label { .. } => None,
        }
    }

    /// Bytes of payload stored in the data region for this operation.
    #[must_use]
    pub fn data_length(&self) -> u16 {
        match self {
            CowOperation::Replace { data_length, .. } | CowOperation::Xor { data_length, .. } => {
                *data_length
            }
            _ => 0,
        }
    }

    /// Source block index of a Copy.
    #[must_use]
    pub fn source_block(&self) -> Option<u64> {
        match self {
            CowOperation::Copy { source_block, .. } => Some(*source_block),
            _ => None,
        }
    }

    /// Byte offset into the source image of an Xor.
    #[must_use]
    pub fn xor_offset(&self) -> Option<u64> {
        match self {
            CowOperation::Xor { source_offset, .. } => Some(*source_offset),
            _ => None,
        }
    }

    /// Payload offset of a Replace.
    #[must_use]
    pub fn data_offset(&self) -> Option<u64> {
        match self {
            CowOperation::Replace { data_offset, .. } => Some(*data_offset),
            _ => None,
        }
    }

    /// Label value of a Label.
    #[must_use]
    pub fn label(&self) -> Option<u64> {
        match self {
            CowOperation::Label { label } => Some(*label),
            _ => None,
        }
    }

    fn raw_fields(&self) -> (u16, u64, u64) {
        match *self {
            CowOperation::Copy {
                new_block,
                source_block,
            } => (0, new_block, source_block),
            CowOperation::Replace {
                new_block,
                data_offset,
                data_length,
            } => (data_length, new_block, data_offset),
            CowOperation::Xor {
                new_block,
                source_offset,
                data_length,
            } => (data_length, new_block, source_offset),
            CowOperation::Zero { new_block } => (0, new_block, 0),
            CowOperation::Label { label } => (0, 0, label),
        }
    }

    /// Writes the 24-byte record for this operation to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let (data_length, new_block, source) = self.raw_fields();
        w.write_u8(self.op_type() as u8)?;
        w.write_u8(0)?;
        w.write_u16::<LittleEndian>(data_length)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u64::<LittleEndian>(new_block)?;
        w.write_u64::<LittleEndian>(source)?;
        Ok(())
    }

    /// Encodes a contiguous run of records.
    pub fn encode_all(ops: &[CowOperation]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ops.len() * OPERATION_BYTES as usize);
        for op in ops {
            // Writes into a Vec cannot fail.
            let _ = op.write_to(&mut buf);
        }
        buf
    }

    /// Reads one record from `r`.
    ///
    /// Returns [`FormatError::Corrupt`] on an unknown type tag.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let tag = r.read_u8()?;
        let _reserved = r.read_u8()?;
        let data_length = r.read_u16::<LittleEndian>()?;
        let _reserved = r.read_u32::<LittleEndian>()?;
        let new_block = r.read_u64::<LittleEndian>()?;
        let source = r.read_u64::<LittleEndian>()?;

        let op_type = OpType::from_u8(tag)
            .ok_or_else(|| FormatError::Corrupt(format!("unknown operation type {}", tag)))?;
        Ok(match op_type {
            OpType::Copy => CowOperation::Copy {
                new_block,
                source_block: source,
            },
            OpType::Replace => CowOperation::Replace {
                new_block,
                data_offset: source,
                data_length,
            },
            OpType::Xor => CowOperation::Xor {
                new_block,
                source_offset: source,
                data_length,
            },
            OpType::Zero => CowOperation::Zero { new_block },
            OpType::Label => CowOperation::Label { label: source },
        })
    }
}
