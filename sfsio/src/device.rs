// SPDX-License-Identifier: MIT

//! Block-granular view over a byte-addressed [`BlockIO`].
//!
//! The file system only ever talks to storage through whole blocks:
//! `read_blocks` / `write_blocks` address blocks by index and transfer
//! `count * block_size` bytes. Partial-block addressing is not offered.

use crate::{BlockIO, BlockIOError, BlockIOExt, BlockIOResult};

#[derive(Debug)]
pub struct BlockDevice<IO: BlockIO> {
    io: IO,
    block_size: usize,
    block_count: u32,
}

impl<IO: BlockIO> BlockDevice<IO> {
    /// Initializes a fresh device of `block_count` zeroed blocks on `io`.
    pub fn create(mut io: IO, block_size: usize, block_count: u32) -> BlockIOResult<Self> {
        if block_size == 0 || block_count == 0 {
            return Err(BlockIOError::Other("empty device geometry"));
        }
        let len = block_size
            .checked_mul(block_count as usize)
            .ok_or(BlockIOError::OutOfBounds)?;
        io.zero_fill(0, len)?;
        io.flush()?;
        Ok(Self {
            io,
            block_size,
            block_count,
        })
    }

    /// Attaches to an existing device, checking that its last block is reachable.
    pub fn open(mut io: IO, block_size: usize, block_count: u32) -> BlockIOResult<Self> {
        if block_size == 0 || block_count == 0 {
            return Err(BlockIOError::Other("empty device geometry"));
        }
        let mut probe = [0u8; 1];
        let last = (block_count as u64 - 1) * block_size as u64 + block_size as u64 - 1;
        io.read_at(last, &mut probe)?;
        Ok(Self {
            io,
            block_size,
            block_count,
        })
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    #[inline]
    pub fn block_offset(&self, block: u32) -> u64 {
        block as u64 * self.block_size as u64
    }

    fn check_range(&self, start: u32, count: u32, buf_len: usize) -> BlockIOResult<usize> {
        let end = start.checked_add(count).ok_or(BlockIOError::OutOfBounds)?;
        if end > self.block_count {
            return Err(BlockIOError::OutOfBounds);
        }
        let bytes = count as usize * self.block_size;
        if buf_len < bytes {
            return Err(BlockIOError::BufferTooSmall);
        }
        Ok(bytes)
    }

    /// Reads `count` blocks starting at `start` into the front of `buf`.
    pub fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> BlockIOResult {
        let bytes = self.check_range(start, count, buf.len())?;
        let offset = self.block_offset(start);
        self.io.read_at(offset, &mut buf[..bytes])
    }

    /// Writes `count` blocks starting at `start` from the front of `buf`.
    pub fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> BlockIOResult {
        let bytes = self.check_range(start, count, buf.len())?;
        let offset = self.block_offset(start);
        self.io.write_at(offset, &buf[..bytes])
    }

    #[inline]
    pub fn flush(&mut self) -> BlockIOResult {
        self.io.flush()
    }

    #[inline]
    pub fn io(&self) -> &IO {
        &self.io
    }

    /// Direct access to the byte-level backend.
    #[inline]
    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    #[inline]
    pub fn into_inner(self) -> IO {
        self.io
    }
}

#[cfg(all(test, feature = "mem"))]
mod tests {
    use super::*;
    use crate::prelude::MemBlockIO;

    #[test]
    fn test_create_zeroes_device() {
        let mut buf = vec![0xEEu8; 4 * 64];
        let dev = BlockDevice::create(MemBlockIO::new(&mut buf), 64, 4).unwrap();
        assert_eq!(dev.block_count(), 4);
        drop(dev);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_create_too_large_for_backend() {
        let mut buf = vec![0u8; 3 * 64];
        let res = BlockDevice::create(MemBlockIO::new(&mut buf), 64, 4);
        assert_eq!(res.err(), Some(BlockIOError::OutOfBounds));
    }

    #[test]
    fn test_open_checks_capacity() {
        let mut buf = vec![0u8; 4 * 64];
        assert!(BlockDevice::open(MemBlockIO::new(&mut buf), 64, 4).is_ok());
        assert_eq!(
            BlockDevice::open(MemBlockIO::new(&mut buf), 64, 5).err(),
            Some(BlockIOError::OutOfBounds)
        );
    }

    #[test]
    fn test_block_rw() {
        let mut buf = vec![0u8; 8 * 32];
        let mut dev = BlockDevice::create(MemBlockIO::new(&mut buf), 32, 8).unwrap();

        let data: Vec<u8> = (0..64u8).collect();
        dev.write_blocks(3, 2, &data).unwrap();

        let mut out = vec![0u8; 64];
        dev.read_blocks(3, 2, &mut out).unwrap();
        assert_eq!(out, data);

        let mut one = vec![0u8; 32];
        dev.read_blocks(4, 1, &mut one).unwrap();
        assert_eq!(one[..], data[32..]);
    }

    #[test]
    fn test_block_range_errors() {
        let mut buf = vec![0u8; 4 * 32];
        let mut dev = BlockDevice::create(MemBlockIO::new(&mut buf), 32, 4).unwrap();

        let mut out = vec![0u8; 64];
        assert_eq!(
            dev.read_blocks(3, 2, &mut out),
            Err(BlockIOError::OutOfBounds)
        );
        assert_eq!(
            dev.write_blocks(0, 3, &out),
            Err(BlockIOError::BufferTooSmall)
        );
    }
}
