// SPDX-License-Identifier: MIT

//! Mounted volume: lifecycle, directory operations and persistence.
//!
//! Every mutating call writes the affected metadata (superblock, inode
//! table, bitmap) back to the device before returning.

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

use log::{debug, warn};
use sfsio::{BlockIO, device::BlockDevice, errors::BlockIOResult};

use crate::core::allocator::{FsAllocator, FsAllocatorError};
use crate::core::errors::{FsError, FsResult};
use crate::core::formatter::FsFormatter;
use crate::fs::{
    allocator::SfsBlockAllocator,
    checker::SfsChecker,
    constant::*,
    descriptor::SfsDescriptorTable,
    directory::SfsDirectory,
    formatter::SfsFormatter,
    inode_table::SfsInodeTable,
    meta::SfsMeta,
    types::{bound_name, display_name},
};

/// Per-descriptor view returned by [`Sfs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfsStat {
    pub inode: u32,
    pub size: u32,
    pub read_cursor: u64,
    pub write_cursor: u64,
}

/// Metadata regions as found on the device.
pub(crate) struct SfsLayout {
    pub directory: SfsDirectory,
    pub inodes: SfsInodeTable,
    pub bitmap: SfsBlockAllocator,
}

pub(crate) fn read_layout<IO: BlockIO>(
    device: &mut BlockDevice<IO>,
    meta: &SfsMeta,
) -> BlockIOResult<SfsLayout> {
    let block_size = meta.block_size as usize;
    let mut block = vec![0u8; block_size];

    device.read_blocks(SFS_SUPERBLOCK_BLOCK, 1, &mut block)?;
    let directory = SfsDirectory::decode(meta, &block);

    let mut table = vec![0u8; meta.inode_table_blocks() as usize * block_size];
    device.read_blocks(meta.inode_table_start(), meta.inode_table_blocks(), &mut table)?;
    let inodes = SfsInodeTable::decode(meta, &table);

    device.read_blocks(meta.bitmap_block(), 1, &mut block)?;
    let bitmap = SfsBlockAllocator::from_block(meta, &block);

    Ok(SfsLayout {
        directory,
        inodes,
        bitmap,
    })
}

/// A mounted SFS volume. Owns the device and every in-memory structure.
pub struct Sfs<IO: BlockIO> {
    pub(crate) device: BlockDevice<IO>,
    pub(crate) meta: SfsMeta,
    pub(crate) directory: SfsDirectory,
    pub(crate) inodes: SfsInodeTable,
    pub(crate) bitmap: SfsBlockAllocator,
    pub(crate) descriptors: SfsDescriptorTable,
    /// One-block buffer for read-modify-write.
    pub(crate) scratch: Vec<u8>,
}

impl<IO: BlockIO> Sfs<IO> {
    /// Formats a fresh volume on `io` (`create_fresh`) or loads the one it holds.
    ///
    /// Loading rejects a bad magic or a recorded geometry other than `meta`.
    /// The descriptor table always starts empty.
    pub fn open_volume(io: IO, meta: SfsMeta, create_fresh: bool) -> FsResult<Self> {
        meta.validate()?;
        let block_size = meta.block_size as usize;

        let mut device = if create_fresh {
            let mut device = BlockDevice::create(io, block_size, meta.block_count)?;
            SfsFormatter::new(device.io_mut(), &meta).format(false)?;
            device
        } else {
            BlockDevice::open(io, block_size, meta.block_count)?
        };

        let SfsLayout {
            directory,
            inodes,
            bitmap,
        } = read_layout(&mut device, &meta)?;
        crate::ensure!(
            directory.header().is_valid(),
            FsError::Invalid("Bad superblock magic")
        );
        crate::ensure!(
            directory.header().matches(&meta),
            FsError::Invalid("Volume geometry does not match")
        );

        debug!(
            "sfs: {} volume ({} files, {} free blocks)",
            if create_fresh { "formatted" } else { "loaded" },
            directory.used_count(),
            bitmap.remaining_units()
        );

        Ok(Self {
            device,
            meta,
            directory,
            inodes,
            bitmap,
            descriptors: SfsDescriptorTable::new(meta.max_open),
            scratch: vec![0u8; block_size],
        })
    }

    /// Creates and formats a new volume.
    pub fn format(io: IO, meta: SfsMeta) -> FsResult<Self> {
        Self::open_volume(io, meta, true)
    }

    /// Loads an existing volume.
    pub fn mount(io: IO, meta: SfsMeta) -> FsResult<Self> {
        Self::open_volume(io, meta, false)
    }

    #[inline]
    pub fn meta(&self) -> &SfsMeta {
        &self.meta
    }

    #[inline]
    pub fn io(&self) -> &IO {
        self.device.io()
    }

    /// Releases the volume, handing back the storage backend.
    pub fn into_inner(self) -> IO {
        self.device.into_inner()
    }

    /// Consistency checker over the on-disk state.
    pub fn checker(&mut self) -> SfsChecker<'_, IO> {
        SfsChecker::new(&mut self.device, &self.meta)
    }

    // === Directory / open-close ===

    /// Opens `name`, creating an empty file if it does not exist.
    ///
    /// An existing file is opened for appending: the write cursor sits at
    /// the end of the file, the read cursor at 0.
    pub fn open(&mut self, name: &str) -> FsResult<usize> {
        let fd = self.descriptors.allocate_unit().inspect_err(|_| {
            warn!("sfs: descriptor table full ({} open)", self.meta.max_open)
        })?;
        let name = bound_name(name)?;

        if let Some((_, inode)) = self.directory.lookup(name) {
            let size = self.inodes.file_size(inode)?;
            self.descriptors.bind(fd, name, inode, size as u64);
            debug!("sfs: opened {:?} (inode {inode}) as fd {fd}", display_name(name));
            return Ok(fd);
        }

        let inode = self
            .inodes
            .find_unused_inode()
            .ok_or(FsAllocatorError::OutOfInodes)
            .inspect_err(|_| warn!("sfs: no free inode for {:?}", display_name(name)))?;
        let slot = self
            .directory
            .find_free_slot()
            .ok_or(FsAllocatorError::OutOfEntries)
            .inspect_err(|_| warn!("sfs: root directory full"))?;

        self.inodes.allocate_unit()?;
        self.directory.bind(slot, name, inode);
        self.descriptors.bind(fd, name, inode, 0);

        self.persist_superblock()?;
        self.persist_inode_table()?;
        self.device.flush()?;

        debug!(
            "sfs: created {:?} (inode {inode}, slot {slot}) as fd {fd}",
            display_name(name)
        );
        Ok(fd)
    }

    pub fn close(&mut self, fd: usize) -> FsResult {
        self.descriptors.release(fd)
    }

    /// Deletes `name`, releasing its inode chain and data blocks.
    ///
    /// Every descriptor open on the file is closed.
    pub fn remove(&mut self, name: &str) -> FsResult {
        let name = bound_name(name)?;
        let (slot, inode) = self.directory.lookup(name).ok_or(FsError::NotFound)?;

        let blocks = self.inodes.release_chain(inode, &mut self.bitmap)?;
        self.directory.unbind(slot);
        let closed = self.descriptors.invalidate_inode(inode);

        self.persist_superblock()?;
        self.persist_inode_table()?;
        self.persist_bitmap()?;
        self.device.flush()?;

        debug!(
            "sfs: removed {:?} (inode {inode}, {blocks} blocks, {closed} descriptors closed)",
            display_name(name)
        );
        Ok(())
    }

    pub fn file_size(&self, name: &str) -> FsResult<u32> {
        let name = bound_name(name)?;
        let (_, inode) = self.directory.lookup(name).ok_or(FsError::NotFound)?;
        Ok(self.inodes.file_size(inode)?)
    }

    /// Enumerates file names one call at a time.
    ///
    /// Returns `None` once after the last file, then starts over.
    pub fn next_file_name(&mut self) -> Option<String> {
        let slot = self.directory.next_used()?;
        self.directory
            .entry(slot)
            .map(|e| String::from_utf8_lossy(e.name_bytes()).into_owned())
    }

    /// `(name, head inode)` of every file.
    pub fn files(&self) -> impl Iterator<Item = (String, u32)> + '_ {
        self.directory.iter().map(|(_, e)| {
            (
                String::from_utf8_lossy(e.name_bytes()).into_owned(),
                e.inode(),
            )
        })
    }

    pub fn stat(&self, fd: usize) -> FsResult<SfsStat> {
        let desc = self.descriptors.get(fd)?;
        let inode = self.descriptors.inode_of(fd)?;
        Ok(SfsStat {
            inode,
            size: self.inodes.file_size(inode)?,
            read_cursor: desc.read_cursor,
            write_cursor: desc.write_cursor,
        })
    }

    #[inline]
    pub fn is_open(&self, fd: usize) -> bool {
        self.descriptors.is_open(fd)
    }

    #[inline]
    pub fn open_count(&self) -> usize {
        self.descriptors.open_count()
    }

    /// Data blocks still available.
    pub fn free_blocks(&self) -> usize {
        self.bitmap.remaining_units()
    }

    pub fn free_inodes(&self) -> usize {
        self.inodes.remaining_units()
    }

    // === Persistence ===

    pub(crate) fn persist_superblock(&mut self) -> FsResult {
        self.scratch.fill(0);
        self.directory.encode(&mut self.scratch);
        self.device
            .write_blocks(SFS_SUPERBLOCK_BLOCK, 1, &self.scratch)?;
        Ok(())
    }

    pub(crate) fn persist_inode_table(&mut self) -> FsResult {
        let blocks = self.meta.inode_table_blocks();
        let mut table = vec![0u8; blocks as usize * self.meta.block_size as usize];
        self.inodes.encode(&mut table);
        self.device
            .write_blocks(self.meta.inode_table_start(), blocks, &table)?;
        Ok(())
    }

    pub(crate) fn persist_bitmap(&mut self) -> FsResult {
        self.device
            .write_blocks(self.meta.bitmap_block(), 1, self.bitmap.as_bytes())?;
        Ok(())
    }
}

#[cfg(all(test, feature = "std", feature = "mem"))]
mod tests {
    use super::*;
    use crate::core::errors::FsErrorKind;
    use crate::core::traits::FsMeta;
    use sfsio::prelude::MemBlockIO;

    fn small_meta() -> SfsMeta {
        SfsMeta::new_custom(128, 40, 7, 2, 4)
    }

    #[test]
    fn test_create_and_reopen() {
        let meta = small_meta();
        let mut buf = vec![0u8; meta.size_bytes() as usize];
        let mut fs = Sfs::format(MemBlockIO::new(&mut buf), meta).unwrap();

        let fd = fs.open("a").unwrap();
        assert_eq!(fd, 0);
        assert_eq!(fs.file_size("a"), Ok(0));
        fs.close(fd).unwrap();
        assert_eq!(fs.close(fd), Err(FsError::BadHandle(0)));

        let fd = fs.open("a").unwrap();
        assert_eq!(fs.stat(fd).unwrap().inode, 0);
        assert_eq!(fs.files().count(), 1);
    }

    #[test]
    fn test_remove_missing() {
        let meta = small_meta();
        let mut buf = vec![0u8; meta.size_bytes() as usize];
        let mut fs = Sfs::format(MemBlockIO::new(&mut buf), meta).unwrap();

        let err = fs.remove("ghost").unwrap_err();
        assert_eq!(err, FsError::NotFound);
        assert_eq!(err.kind(), FsErrorKind::NotFound);
        assert_eq!(fs.file_size("ghost"), Err(FsError::NotFound));
    }

    #[test]
    fn test_out_of_inodes() {
        let meta = small_meta();
        let mut buf = vec![0u8; meta.size_bytes() as usize];
        let mut fs = Sfs::format(MemBlockIO::new(&mut buf), meta).unwrap();

        for i in 0..7 {
            let fd = fs.open(&format!("f{i}")).unwrap();
            fs.close(fd).unwrap();
        }
        let err = fs.open("one_more").unwrap_err();
        assert_eq!(err, FsError::Allocator(FsAllocatorError::OutOfInodes));
        assert_eq!(err.kind(), FsErrorKind::ResourceExhausted);
        assert_eq!(fs.free_inodes(), 0);
    }

    #[test]
    fn test_invalid_names() {
        let meta = small_meta();
        let mut buf = vec![0u8; meta.size_bytes() as usize];
        let mut fs = Sfs::format(MemBlockIO::new(&mut buf), meta).unwrap();

        assert_eq!(fs.open("").unwrap_err().kind(), FsErrorKind::InvalidArgument);
        assert_eq!(
            fs.remove("a\0").unwrap_err().kind(),
            FsErrorKind::InvalidArgument
        );
        assert_eq!(fs.open_count(), 0);
    }

    #[test]
    fn test_mount_rejects_foreign_geometry() {
        let meta = small_meta();
        let mut buf = vec![0u8; meta.size_bytes() as usize];
        drop(Sfs::format(MemBlockIO::new(&mut buf), meta).unwrap());

        let other = SfsMeta::new_custom(128, 40, 7, 3, 4);
        let err = Sfs::mount(MemBlockIO::new(&mut buf), other).err();
        assert_eq!(err, Some(FsError::Invalid("Volume geometry does not match")));

        buf[0] ^= 0xFF;
        let err = Sfs::mount(MemBlockIO::new(&mut buf), meta).err();
        assert_eq!(err, Some(FsError::Invalid("Bad superblock magic")));
    }
}
