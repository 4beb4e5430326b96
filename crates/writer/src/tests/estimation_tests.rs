use super::helpers::*;
use crate::*;
use format::{layout, OPERATION_BYTES};
use std::io::Cursor;

/// A fixed script of emit calls exercising every operation type.
fn script<S: format::CowStorage>(w: &mut CowWriter<S>) {
    w.emit_sequence_data(&[2, 0, 1]).unwrap();
    w.emit_copy(100, 50, 3).unwrap();
    w.emit_raw_blocks(10, &compressible(3, 7)).unwrap();
    w.emit_label(1).unwrap();
    w.emit_xor_blocks(20, &noise(2, 42), 4, 16).unwrap();
    w.emit_zero_blocks(30, 4).unwrap();
    w.emit_label(2).unwrap();
    w.emit_raw_blocks(40, &noise(1, 8)).unwrap();
    w.finalize().unwrap();
}

#[test]
fn estimation_touches_no_storage_and_grows_capacity() {
    let mut est = CowEstimator::for_estimation(options("none", 0)).unwrap();
    assert!(est.is_estimating());
    est.initialize(None).unwrap();
    let start = est.get_cow_size();

    est.emit_copy(0, 0, 5).unwrap();
    assert_eq!(est.op_count(), 5);
    assert_eq!(est.op_count_max(), 5);
    assert_eq!(est.get_cow_size(), start + 5 * OPERATION_BYTES);

    est.emit_raw_blocks(0, &noise(2, 1)).unwrap();
    assert_eq!(est.op_count_max(), 7);
    assert_eq!(est.get_cow_size(), start + 7 * OPERATION_BYTES + 2 * BLOCK as u64);
    assert_eq!(est.get_cow_size(), layout::data_offset(est.header()) + 2 * BLOCK as u64);
}

#[test]
fn estimation_keeps_a_larger_initial_ceiling() {
    let mut est = CowEstimator::for_estimation(options("none", 10)).unwrap();
    est.initialize(None).unwrap();
    let start = est.get_cow_size();
    est.emit_zero_blocks(0, 4).unwrap();
    assert_eq!(est.op_count_max(), 10);
    assert_eq!(est.get_cow_size(), start);
}

#[test]
fn estimate_then_write_agree() {
    for compression in ["none", "lz4", "gz,6", "zstd"] {
        let mut est = CowEstimator::for_estimation(options(compression, 0)).unwrap();
        est.initialize(None).unwrap();
        script(&mut est);

        let op_count = est.op_count();
        let cow_size = est.get_cow_size();
        let op_count_max = est.op_count_max();
        assert_eq!(op_count, op_count_max);

        let mut w = est.into_writer(Cursor::new(Vec::new())).unwrap();
        assert!(!w.is_estimating());
        assert_eq!(w.op_count_max(), op_count_max);
        w.initialize(None).unwrap();
        script(&mut w);

        assert_eq!(w.op_count(), op_count, "{}", compression);
        assert_eq!(w.get_cow_size(), cow_size, "{}", compression);

        let image = w.into_storage().unwrap().into_inner();
        assert_eq!(image.len() as u64, cow_size);
        let (header, parsed) = parse_image(&image);
        assert_eq!(header.op_count, op_count);
        assert_eq!(parsed.translate().len() as u64, op_count);
    }
}

#[test]
fn estimation_cannot_resume() {
    let mut est = CowEstimator::for_estimation(options("none", 0)).unwrap();
    assert!(matches!(est.initialize(Some(1)), Err(CowError::InvalidInput(_))));
}

#[test]
fn write_mode_cannot_become_an_estimator_target() {
    let w = memory_writer("none", 4);
    assert!(matches!(
        w.into_writer(Cursor::new(Vec::new())),
        Err(CowError::InvalidInput(_))
    ));
}

#[test]
fn estimated_labels_stay_in_memory() {
    let mut est = CowEstimator::for_estimation(options("none", 0)).unwrap();
    est.initialize(None).unwrap();
    est.emit_copy(0, 0, 2).unwrap();
    est.emit_label(1).unwrap();
    assert_eq!(est.resume_points().len(), 1);
    assert!(est.into_storage().is_none());
}
