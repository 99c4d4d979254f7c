// SPDX-License-Identifier: MIT

//! Block-spanning positioned I/O.
//!
//! Transfers are split at block boundaries. Each piece is located through
//! the inode chain; writes past the allocated end take fresh blocks from
//! the bitmap and extend the chain with link inodes as needed.
//!
//! Short transfers follow the `std::io` contract: once at least one byte
//! moved, a failure ends the call with `Ok(n)` and surfaces on the next call.

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use log::{trace, warn};
use sfsio::BlockIO;

use crate::core::errors::{FsCursorError, FsError, FsResult};
use crate::fs::{constant::SFS_INODE_FREE, volume::Sfs};

impl<IO: BlockIO> Sfs<IO> {
    /// Moves the read cursor of `fd`. Offsets past the end of file are rejected.
    pub fn seek_read(&mut self, fd: usize, offset: u64) -> FsResult {
        self.check_seek(fd, offset)?;
        self.descriptors.get_mut(fd)?.read_cursor = offset;
        Ok(())
    }

    /// Moves the write cursor of `fd`. Offsets past the end of file are rejected.
    pub fn seek_write(&mut self, fd: usize, offset: u64) -> FsResult {
        self.check_seek(fd, offset)?;
        self.descriptors.get_mut(fd)?.write_cursor = offset;
        Ok(())
    }

    fn check_seek(&self, fd: usize, offset: u64) -> FsResult {
        let inode = self.descriptors.inode_of(fd)?;
        let size = self.inodes.file_size(inode)? as u64;
        crate::ensure!(
            offset <= size,
            FsError::Invalid("Offset beyond end of file")
        );
        Ok(())
    }

    /// Reads up to `buf.len()` bytes at the read cursor, stopping at end of file.
    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> FsResult<usize> {
        let head = self.descriptors.inode_of(fd)?;
        let cursor = self.descriptors.get(fd)?.read_cursor;
        let size = self.inodes.file_size(head)? as u64;

        if buf.is_empty() || cursor >= size {
            return Ok(0);
        }
        let len = (buf.len() as u64).min(size - cursor) as usize;
        let block_size = self.meta.block_size as u64;

        let mut done = 0;
        while done < len {
            let pos = cursor + done as u64;
            let in_block = (pos % block_size) as usize;
            let chunk = (block_size as usize - in_block).min(len - done);

            if let Err(e) = self.read_piece(head, pos, in_block, &mut buf[done..done + chunk]) {
                if done == 0 {
                    return Err(e);
                }
                warn!("sfs: short read on fd {fd}: {done} of {len} bytes ({e})");
                break;
            }
            done += chunk;
        }

        self.descriptors.get_mut(fd)?.read_cursor = cursor + done as u64;
        Ok(done)
    }

    fn read_piece(&mut self, head: u32, pos: u64, in_block: usize, out: &mut [u8]) -> FsResult {
        let block = self
            .inodes
            .locate_block(head, pos)?
            .ok_or(FsCursorError::Unallocated(pos))?;

        if out.len() == self.scratch.len() {
            self.device.read_blocks(block, 1, out)?;
        } else {
            self.device.read_blocks(block, 1, &mut self.scratch)?;
            out.copy_from_slice(&self.scratch[in_block..in_block + out.len()]);
        }
        Ok(())
    }

    /// Writes `data` at the write cursor, growing the file as needed.
    ///
    /// The inode table is persisted before returning (and the bitmap when a
    /// block was allocated), whether or not the transfer completed.
    pub fn write(&mut self, fd: usize, data: &[u8]) -> FsResult<usize> {
        let head = self.descriptors.inode_of(fd)?;
        let cursor = self.descriptors.get(fd)?.write_cursor;

        if data.is_empty() {
            return Ok(0);
        }
        crate::ensure!(
            cursor + (data.len() as u64) < SFS_INODE_FREE as u64,
            FsError::Invalid("File size limit exceeded")
        );
        let block_size = self.meta.block_size as u64;

        let mut done = 0;
        let mut allocated = false;
        let mut failure = None;
        while done < data.len() {
            let pos = cursor + done as u64;
            let in_block = (pos % block_size) as usize;
            let chunk = (block_size as usize - in_block).min(data.len() - done);

            match self.write_piece(head, pos, in_block, &data[done..done + chunk], &mut allocated) {
                Ok(()) => done += chunk,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let after = cursor + done as u64;
        if let Some(inode) = self.inodes.get_mut(head) {
            inode.size = inode.size.max(after as u32);
        }
        self.descriptors.get_mut(fd)?.write_cursor = after;

        self.persist_inode_table()?;
        if allocated {
            self.persist_bitmap()?;
        }
        self.device.flush()?;

        if let Some(e) = failure {
            if done == 0 {
                return Err(e);
            }
            warn!("sfs: short write on fd {fd}: {done} of {} bytes ({e})", data.len());
        }
        Ok(done)
    }

    fn write_piece(
        &mut self,
        head: u32,
        pos: u64,
        in_block: usize,
        src: &[u8],
        allocated: &mut bool,
    ) -> FsResult {
        let (owner, slot) = self.inodes.extend_to(head, pos)?;
        let whole = src.len() == self.scratch.len();

        let existing = self.inodes.get(owner).and_then(|i| i.block(slot));
        let block = match existing {
            Some(block) => {
                if !whole {
                    self.device.read_blocks(block, 1, &mut self.scratch)?;
                }
                block
            }
            None => {
                let block = self.bitmap.allocate().inspect_err(|_| {
                    warn!("sfs: out of data blocks at offset {pos} of inode {head}")
                })?;
                *allocated = true;
                self.inodes.set_direct(owner, slot, block);
                trace!("sfs: block {block} -> inode {owner} slot {slot}");
                if !whole {
                    self.scratch.fill(0);
                }
                block
            }
        };

        if whole {
            self.device.write_blocks(block, 1, src)?;
        } else {
            self.scratch[in_block..in_block + src.len()].copy_from_slice(src);
            self.device.write_blocks(block, 1, &self.scratch)?;
        }
        Ok(())
    }

    /// Reads from the read cursor to end of file.
    pub fn read_to_vec(&mut self, fd: usize) -> FsResult<Vec<u8>> {
        let stat = self.stat(fd)?;
        let remaining = (stat.size as u64).saturating_sub(stat.read_cursor) as usize;
        let mut out = vec![0u8; remaining];
        let n = self.read(fd, &mut out)?;
        out.truncate(n);
        Ok(out)
    }

    /// Writes the whole buffer or fails.
    pub fn write_all(&mut self, fd: usize, mut data: &[u8]) -> FsResult {
        while !data.is_empty() {
            match self.write(fd, data)? {
                0 => crate::bail!(FsError::Other("Write made no progress")),
                n => data = &data[n..],
            }
        }
        Ok(())
    }
}
