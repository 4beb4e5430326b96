//! Region offsets derived from the header.
//!
//! Every offset is a pure function of the header, so a reader and a writer
//! holding the same header agree on where each region starts. The data
//! region always begins exactly where the operation table ends; growing
//! `op_count_max` therefore shifts the data region by `OPERATION_BYTES` per
//! extra slot.

use crate::{
    CowHeader, HEADER_BYTES, OPERATION_BYTES, RESUME_POINT_BYTES, SEQUENCE_ENTRY_BYTES,
};

/// Start of the scratch region. The full header region is always
/// allocated, whatever `header_size` declares.
pub fn scratch_offset(_header: &CowHeader) -> u64 {
    HEADER_BYTES
}

/// Start of the sequence-data array.
pub fn sequence_offset(header: &CowHeader) -> u64 {
    scratch_offset(header) + u64::from(header.buffer_size)
}

/// Start of the resume-point table.
pub fn resume_offset(header: &CowHeader) -> u64 {
    sequence_offset(header) + header.sequence_data_count * SEQUENCE_ENTRY_BYTES
}

/// Offset of the operation record at `index`.
pub fn op_offset(index: u64, header: &CowHeader) -> u64 {
    resume_offset(header)
        + u64::from(header.resume_point_max) * RESUME_POINT_BYTES
        + index * OPERATION_BYTES
}

/// Start of the data region: one past the last operation slot.
pub fn data_offset(header: &CowHeader) -> u64 {
    op_offset(header.op_count_max, header)
}
