use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Size of one resume-table entry: 8 (`label`) + 8 (`op_index`).
pub const RESUME_POINT_BYTES: u64 = 8 + 8;

/// A checkpoint the writer can be reopened at.
///
/// `op_index` is the operation count at the moment the label was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    pub label: u64,
    pub op_index: u64,
}

impl ResumePoint {
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u64::<LittleEndian>(self.label)?;
        w.write_u64::<LittleEndian>(self.op_index)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let label = r.read_u64::<LittleEndian>()?;
        let op_index = r.read_u64::<LittleEndian>()?;
        Ok(Self { label, op_index })
    }

    /// Encodes a resume table in list order.
    pub fn encode_all(points: &[ResumePoint]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(points.len() * RESUME_POINT_BYTES as usize);
        for p in points {
            // Writes into a Vec cannot fail.
            let _ = p.write_to(&mut buf);
        }
        buf
    }
}
