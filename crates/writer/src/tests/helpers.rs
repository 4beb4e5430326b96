use config::CowOptions;
use format::{layout, CowHeader, CowOperation, CowStorage};
use parser::{CowParser, ParsedCow};
use std::io::{self, Cursor};

use crate::CowWriter;

pub const BLOCK: usize = 4096;

/// One call observed by [`FaultyStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEvent {
    Write { offset: u64 },
    Sync,
}

/// In-memory storage that fails the `fail_on`-th `write_at` call (1-based,
/// counted from the last `arm`), or every `sync` while `fail_sync` is set.
pub struct FaultyStorage {
    pub inner: Cursor<Vec<u8>>,
    pub writes: usize,
    pub syncs: usize,
    pub fail_on: Option<usize>,
    pub fail_sync: bool,
    pub events: Vec<StorageEvent>,
}

impl FaultyStorage {
    pub fn new() -> Self {
        Self {
            inner: Cursor::new(Vec::new()),
            writes: 0,
            syncs: 0,
            fail_on: None,
            fail_sync: false,
            events: Vec::new(),
        }
    }

    pub fn arm(&mut self, fail_on: usize) {
        self.writes = 0;
        self.fail_on = Some(fail_on);
    }
}

impl CowStorage for FaultyStorage {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.writes += 1;
        self.events.push(StorageEvent::Write { offset });
        if self.fail_on == Some(self.writes) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        self.inner.write_at(offset, buf)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_at(offset, buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.syncs += 1;
        self.events.push(StorageEvent::Sync);
        if self.fail_sync {
            return Err(io::Error::new(io::ErrorKind::Other, "injected sync failure"));
        }
        Ok(())
    }
}

pub fn options(compression: &str, op_count_max: u64) -> CowOptions {
    CowOptions {
        compression: compression.to_string(),
        op_count_max,
        ..CowOptions::default()
    }
}

/// A fresh, initialized write-mode writer over an in-memory image.
pub fn memory_writer(compression: &str, op_count_max: u64) -> CowWriter<Cursor<Vec<u8>>> {
    let mut w = CowWriter::new(options(compression, op_count_max), Cursor::new(Vec::new())).unwrap();
    w.initialize(None).unwrap();
    w
}

/// Blocks that compress well: each holds runs of repeated bytes.
pub fn compressible(blocks: usize, seed: u8) -> Vec<u8> {
    (0..blocks * BLOCK)
        .map(|i| seed.wrapping_add((i / 128) as u8))
        .collect()
}

/// xorshift noise; does not compress.
pub fn noise(blocks: usize, mut state: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(blocks * BLOCK);
    while out.len() < blocks * BLOCK {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(blocks * BLOCK);
    out
}

/// Parses an image by its header's op_count.
pub fn parse_image(image: &[u8]) -> (CowHeader, ParsedCow) {
    let mut cursor = Cursor::new(image.to_vec());
    let header = CowParser::read_header(&mut cursor).unwrap();
    let parsed = CowParser::parse(&mut cursor, &header, None).unwrap();
    (header, parsed)
}

/// Collects the payload of every data-carrying op, in order.
pub fn payloads(image: &[u8], header: &CowHeader, ops: &[CowOperation]) -> Vec<Vec<u8>> {
    let mut pos = layout::data_offset(header) as usize;
    let mut out = Vec::new();
    for op in ops {
        let len = op.data_length() as usize;
        if len > 0 {
            out.push(image[pos..pos + len].to_vec());
            pos += len;
        }
    }
    out
}
