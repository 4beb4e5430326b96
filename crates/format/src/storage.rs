use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Seekable storage a COW file is written to.
///
/// The writer only ever issues positioned reads and writes; it never relies
/// on the current cursor of the underlying handle. `sync` must not return
/// until previously written bytes are durable.
pub trait CowStorage {
    /// Writes all of `buf` starting at `offset`.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;

    /// Fills `buf` from `offset`; a short read is an `UnexpectedEof` error.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Flushes written bytes to stable storage.
    fn sync(&mut self) -> io::Result<()>;
}

impl CowStorage for File {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

/// In-memory storage, used by tests and by callers that build a COW image
/// in memory before shipping it elsewhere.
impl CowStorage for Cursor<Vec<u8>> {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: CowStorage + ?Sized> CowStorage for &mut S {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        (**self).write_at(offset, buf)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}
