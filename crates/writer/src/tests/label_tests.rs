use super::helpers::*;
use crate::*;
use format::{layout, ResumePoint};

fn labels(points: &[ResumePoint]) -> Vec<u64> {
    points.iter().map(|p| p.label).collect()
}

#[test]
fn label_records_current_op_count() {
    let mut w = memory_writer("none", 16);
    w.emit_copy(0, 0, 3).unwrap();
    w.emit_label(1).unwrap();
    w.emit_zero_blocks(3, 2).unwrap();
    w.emit_label(2).unwrap();

    assert_eq!(
        w.resume_points(),
        &[
            ResumePoint {
                label: 1,
                op_index: 3
            },
            ResumePoint {
                label: 2,
                op_index: 5
            },
        ]
    );
    assert_eq!(w.header().resume_point_count, 2);
}

#[test]
fn label_is_durable_on_disk() {
    let mut w = memory_writer("none", 16);
    w.emit_copy(0, 0, 2).unwrap();
    w.emit_label(10).unwrap();
    w.emit_copy(2, 2, 2).unwrap();
    w.emit_label(11).unwrap();

    // no explicit finalize: the label already rewrote the header
    let in_memory = w.resume_points().to_vec();
    let image = w.into_storage().unwrap().into_inner();
    let (header, parsed) = parse_image(&image);
    assert_eq!(header.op_count, 4);
    assert_eq!(parsed.resume_points(), &in_memory[..]);
}

#[test]
fn label_syncs_the_table_before_the_header() {
    let mut w = CowWriter::new(options("none", 4), FaultyStorage::new()).unwrap();
    w.initialize(None).unwrap();
    let table = layout::resume_offset(w.header());
    w.storage_mut().unwrap().events.clear();

    w.emit_label(1).unwrap();
    assert_eq!(
        w.storage_mut().unwrap().events,
        vec![
            StorageEvent::Write { offset: table },
            StorageEvent::Sync,
            StorageEvent::Write { offset: 0 },
            StorageEvent::Sync,
        ]
    );
}

#[test]
fn failed_resume_table_sync_keeps_previous_points() {
    let mut w = CowWriter::new(options("none", 4), FaultyStorage::new()).unwrap();
    w.initialize(None).unwrap();
    w.emit_label(1).unwrap();

    let storage = w.storage_mut().unwrap();
    storage.fail_sync = true;
    storage.events.clear();
    assert!(matches!(w.emit_label(2), Err(CowError::Io(_))));
    assert_eq!(labels(w.resume_points()), vec![1]);
    assert_eq!(w.header().resume_point_count, 1);
    // the header was never rewritten
    assert!(!w
        .storage_mut()
        .unwrap()
        .events
        .contains(&StorageEvent::Write { offset: 0 }));
}

#[test]
fn reusing_a_label_drops_stale_higher_ones() {
    let mut w = memory_writer("none", 16);
    w.emit_label(5).unwrap();
    w.emit_copy(0, 0, 1).unwrap();
    w.emit_label(6).unwrap();
    w.emit_copy(1, 1, 1).unwrap();
    w.emit_label(5).unwrap();
    assert_eq!(labels(w.resume_points()), vec![5]);
    assert_eq!(w.resume_points()[0].op_index, 2);

    w.emit_label(3).unwrap();
    assert_eq!(labels(w.resume_points()), vec![3]);

    let image = w.into_storage().unwrap().into_inner();
    let (header, parsed) = parse_image(&image);
    assert_eq!(header.resume_point_count, 1);
    assert_eq!(labels(parsed.resume_points()), vec![3]);
}

#[test]
fn table_never_exceeds_capacity() {
    let mut w = memory_writer("none", 16);
    for label in 0..10 {
        w.emit_zero_blocks(label, 1).unwrap();
        w.emit_label(label).unwrap();
        assert!(w.resume_points().len() <= format::RESUME_POINT_MAX as usize);
    }
    assert_eq!(labels(w.resume_points()), vec![6, 7, 8, 9]);

    let image = w.into_storage().unwrap().into_inner();
    let (_, parsed) = parse_image(&image);
    assert_eq!(labels(parsed.resume_points()), vec![6, 7, 8, 9]);
}

#[test]
fn failed_resume_table_write_keeps_previous_points() {
    let mut w = CowWriter::new(options("none", 4), FaultyStorage::new()).unwrap();
    w.initialize(None).unwrap();
    w.emit_label(1).unwrap();

    w.storage_mut().unwrap().arm(1);
    assert!(matches!(w.emit_label(2), Err(CowError::Io(_))));
    assert_eq!(labels(w.resume_points()), vec![1]);
    assert_eq!(w.header().resume_point_count, 1);
}
