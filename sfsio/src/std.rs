// SPDX-License-Identifier: MIT

use std::fs::{File, OpenOptions};
use std::io::{Error, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{BlockIO, BlockIOError, BlockIOResult};

/// `BlockIO` over any seekable std stream (image file, `Cursor<Vec<u8>>`, ...).
#[derive(Debug)]
pub struct StdBlockIO<T: Read + Write + Seek> {
    io: T,
}

impl<T: Read + Write + Seek> StdBlockIO<T> {
    #[inline]
    pub fn new(io: T) -> Self {
        Self { io }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl StdBlockIO<File> {
    /// Creates (or truncates) the image file at `path` and sizes it to `len` bytes.
    pub fn create_file<P: AsRef<Path>>(path: P, len: u64) -> BlockIOResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len)?;
        Ok(Self::new(file))
    }

    /// Opens an existing image file at `path` for reading and writing.
    pub fn open_file<P: AsRef<Path>>(path: P) -> BlockIOResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(file))
    }

    /// Current length of the image file in bytes.
    pub fn len(&self) -> BlockIOResult<u64> {
        Ok(self.io.metadata()?.len())
    }
}

impl<T: Read + Write + Seek> BlockIO for StdBlockIO<T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => BlockIOError::OutOfBounds,
            _ => BlockIOError::from(e),
        })?;
        Ok(())
    }

    fn flush(&mut self) -> BlockIOResult {
        self.io.flush()?;
        Ok(())
    }
}

impl From<Error> for BlockIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        // Leak the string to produce a 'static str. Acceptable for error mapping.
        let leaked_str: &'static str = Box::leak(e.to_string().into_boxed_str());
        BlockIOError::Other(leaked_str)
    }
}
