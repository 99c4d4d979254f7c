// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use log::debug;
use sfsio::BlockIO;

use crate::core::formatter::*;
use crate::core::traits::FsMeta;
use crate::fs::{
    allocator::SfsBlockAllocator, directory::SfsDirectory, inode_table::SfsInodeTable,
    meta::SfsMeta,
};

/// Writes an empty SFS layout: superblock with an empty root, all-free
/// inode table and a bitmap with the metadata blocks reserved.
pub struct SfsFormatter<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    meta: &'a SfsMeta,
}

impl<'a, IO: BlockIO + ?Sized> SfsFormatter<'a, IO> {
    pub fn new(io: &'a mut IO, meta: &'a SfsMeta) -> Self {
        Self { io, meta }
    }

    fn write_superblock(&mut self, buf: &mut [u8]) -> FsFormatterResult {
        buf.fill(0);
        SfsDirectory::new(self.meta).encode(buf);
        self.io.write_at(self.meta.unit_offset(0), buf)?;
        Ok(())
    }

    fn write_inode_table(&mut self) -> FsFormatterResult {
        let len = self.meta.inode_table_blocks() as usize * self.meta.unit_size();
        let mut table = vec![0u8; len];
        SfsInodeTable::new(self.meta).encode(&mut table);
        self.io
            .write_at(self.meta.unit_offset(self.meta.inode_table_start()), &table)?;
        Ok(())
    }

    fn write_bitmap(&mut self) -> FsFormatterResult {
        let bitmap = SfsBlockAllocator::new(self.meta);
        self.io.write_at(
            self.meta.unit_offset(self.meta.bitmap_block()),
            bitmap.as_bytes(),
        )?;
        Ok(())
    }
}

impl<IO: BlockIO + ?Sized> FsFormatter for SfsFormatter<'_, IO> {
    fn format(&mut self, full_format: bool) -> FsFormatterResult {
        self.meta
            .validate()
            .map_err(|e| FsFormatterError::Invalid(e.msg()))?;

        let mut block: Vec<u8> = vec![0u8; self.meta.unit_size()];
        self.write_superblock(&mut block)?;
        self.write_inode_table()?;
        self.write_bitmap()?;

        if full_format {
            zero_data_region(self.io, self.meta)?;
        }

        debug!(
            "sfs: formatted {} blocks of {} bytes ({} inodes, {} data blocks, full={full_format})",
            self.meta.block_count,
            self.meta.block_size,
            self.meta.inode_count,
            self.meta.data_block_count()
        );
        self.flush()
    }

    fn flush(&mut self) -> FsFormatterResult {
        self.io.flush()?;
        Ok(())
    }
}
