use crate::*;
use std::io::Cursor;

fn sample_header() -> CowHeader {
    let mut h = CowHeader::new(DEFAULT_BLOCK_SIZE);
    h.compression_algorithm = 3;
    h.op_count = 7;
    h.op_count_max = 16;
    h.num_merge_ops = 2;
    h.sequence_data_count = 5;
    h.resume_point_count = 2;
    h.buffer_size = BUFFER_REGION_DEFAULT_SIZE;
    h
}

#[test]
fn new_header_has_v3_defaults() {
    let h = CowHeader::new(4096);
    assert_eq!(h.magic, COW_MAGIC);
    assert_eq!(h.major_version, COW_MAJOR_VERSION);
    assert_eq!(h.header_size as u64, HEADER_BYTES);
    assert_eq!(h.op_size as u64, OPERATION_BYTES);
    assert_eq!(h.resume_point_max, RESUME_POINT_MAX);
    assert_eq!(h.op_count, 0);
    assert_eq!(h.op_count_max, 0);
}

#[test]
fn header_image_is_fixed_size_and_decodes() {
    let h = sample_header();
    let bytes = h.to_bytes();
    assert_eq!(bytes.len() as u64, HEADER_BYTES);
    assert_eq!(&bytes[..8], b"COWSNAP3");

    let decoded = CowHeader::read_from(&mut Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(decoded, h);
}

#[test]
fn flipped_byte_fails_checksum() {
    let mut bytes = sample_header().to_bytes();
    bytes[30] ^= 0xff; // inside op_count
    match CowHeader::from_bytes(&bytes) {
        Err(FormatError::ChecksumMismatch { .. }) => {}
        other => panic!("expected checksum mismatch, got {:?}", other),
    }
}

#[test]
fn wrong_magic_is_rejected() {
    let mut bytes = sample_header().to_bytes();
    bytes[0] = b'X';
    assert!(matches!(
        CowHeader::from_bytes(&bytes),
        Err(FormatError::BadMagic(_))
    ));
}

#[test]
fn truncated_header_is_rejected() {
    let bytes = sample_header().to_bytes();
    assert!(matches!(
        CowHeader::from_bytes(&bytes[..40]),
        Err(FormatError::Corrupt(_))
    ));
}

#[test]
fn unsupported_major_version_is_rejected() {
    let mut h = sample_header();
    h.major_version = 2;
    let bytes = h.to_bytes();
    assert!(matches!(
        CowHeader::from_bytes(&bytes),
        Err(FormatError::UnsupportedVersion { major: 2, .. })
    ));
}

#[test]
fn op_count_above_capacity_is_corrupt() {
    let mut h = sample_header();
    h.op_count = h.op_count_max + 1;
    // to_bytes recomputes the CRC, so only validation can catch this
    let bytes = h.to_bytes();
    assert!(matches!(
        CowHeader::from_bytes(&bytes),
        Err(FormatError::Corrupt(_))
    ));
}

#[test]
fn header_size_bounds_are_enforced() {
    let mut h = sample_header();
    h.header_size = (HEADER_MIN_BYTES - 1) as u16;
    assert!(h.validate().is_err());

    h.header_size = (HEADER_BYTES + 1) as u16;
    assert!(h.validate().is_err());

    h.header_size = HEADER_BYTES as u16;
    assert!(h.validate().is_ok());
}

#[test]
fn oversized_block_size_is_corrupt() {
    let mut h = sample_header();
    h.block_size = 65536;
    assert!(h.validate().is_err());
}
