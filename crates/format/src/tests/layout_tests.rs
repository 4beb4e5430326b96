use crate::layout::*;
use crate::*;

#[test]
fn regions_follow_each_other_without_gaps() {
    let mut h = CowHeader::new(4096);
    h.buffer_size = 1024;
    h.sequence_data_count = 3;
    h.op_count_max = 10;

    assert_eq!(scratch_offset(&h), HEADER_BYTES);
    assert_eq!(sequence_offset(&h), HEADER_BYTES + 1024);
    assert_eq!(resume_offset(&h), sequence_offset(&h) + 3 * SEQUENCE_ENTRY_BYTES);
    assert_eq!(
        op_offset(0, &h),
        resume_offset(&h) + RESUME_POINT_MAX as u64 * RESUME_POINT_BYTES
    );
    assert_eq!(op_offset(4, &h), op_offset(0, &h) + 4 * OPERATION_BYTES);
    assert_eq!(data_offset(&h), op_offset(0, &h) + 10 * OPERATION_BYTES);
}

#[test]
fn short_declared_header_does_not_overlap_the_scratch_region() {
    let mut h = CowHeader::new(4096);
    h.header_size = HEADER_MIN_BYTES as u16;
    assert!(h.validate().is_ok());
    assert_eq!(scratch_offset(&h), HEADER_BYTES);
    assert_eq!(h.to_bytes().len() as u64, HEADER_BYTES);
}

#[test]
fn data_region_moves_with_op_capacity() {
    let mut h = CowHeader::new(4096);
    let before = data_offset(&h);
    h.op_count_max += 3;
    assert_eq!(data_offset(&h), before + 3 * OPERATION_BYTES);
}

#[test]
fn empty_optional_regions_take_no_space() {
    let h = CowHeader::new(4096);
    assert_eq!(sequence_offset(&h), HEADER_BYTES);
    assert_eq!(resume_offset(&h), HEADER_BYTES);
    assert_eq!(
        data_offset(&h),
        HEADER_BYTES + RESUME_POINT_MAX as u64 * RESUME_POINT_BYTES
    );
}
