// SPDX-License-Identifier: MIT

use crate::{
    core::{FsError, FsResult, traits::FsMeta},
    fs::{constant::*, types::SfsSuperblockHeader},
};
use sfsio::{BlockIO, BlockIOStructExt};

/// Volume geometry.
///
/// Layout on the device:
///
/// ```text
/// | 0: superblock + root | 1..=T: inode table | data blocks ... | last: bitmap |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfsMeta {
    pub block_size: u32,
    pub block_count: u32,
    /// Number of inode slots, also the number of root directory entries.
    pub inode_count: u32,
    /// Direct block pointers per inode.
    pub direct_count: u32,
    /// Descriptor table capacity (in memory only).
    pub max_open: usize,
}

impl Default for SfsMeta {
    fn default() -> Self {
        Self::new_custom(
            SFS_DEFAULT_BLOCK_SIZE,
            SFS_DEFAULT_BLOCK_COUNT,
            SFS_DEFAULT_INODE_COUNT,
            SFS_DEFAULT_DIRECT_COUNT,
            SFS_DEFAULT_MAX_OPEN,
        )
    }
}

impl SfsMeta {
    pub fn new_custom(
        block_size: u32,
        block_count: u32,
        inode_count: u32,
        direct_count: u32,
        max_open: usize,
    ) -> Self {
        Self {
            block_size,
            block_count,
            inode_count,
            direct_count,
            max_open,
        }
    }

    /// Reads the geometry recorded in the superblock of an existing volume.
    ///
    /// `max_open` is not persisted and falls back to the default.
    pub fn from_io<IO: BlockIO + ?Sized>(io: &mut IO) -> FsResult<Self> {
        let sb: SfsSuperblockHeader = io.read_struct(0)?;
        crate::ensure!(sb.is_valid(), FsError::Invalid("Bad superblock magic"));

        let meta = Self::new_custom(
            sb.s_block_size,
            sb.s_block_count,
            sb.s_inode_count as u32,
            sb.s_direct_count as u32,
            SFS_DEFAULT_MAX_OPEN,
        );
        meta.validate()?;
        Ok(meta)
    }

    /// On-disk size of one inode record.
    #[inline]
    pub fn inode_size(&self) -> usize {
        SFS_INODE_HEADER_SIZE + SFS_POINTER_SIZE * self.direct_count as usize
    }

    /// Bytes addressable through the direct pointers of a single inode.
    #[inline]
    pub fn capacity_per_inode(&self) -> u64 {
        self.direct_count as u64 * self.block_size as u64
    }

    /// Header plus one entry per inode.
    #[inline]
    pub fn superblock_size(&self) -> usize {
        SFS_SUPERBLOCK_HEADER_SIZE + SFS_DIRENT_SIZE * self.inode_count as usize
    }

    #[inline]
    pub fn inode_table_start(&self) -> u32 {
        SFS_SUPERBLOCK_BLOCK + 1
    }

    pub fn inode_table_blocks(&self) -> u32 {
        let bytes = self.inode_count as u64 * self.inode_size() as u64;
        bytes.div_ceil(self.block_size.max(1) as u64) as u32
    }

    #[inline]
    pub fn first_data_block(&self) -> u32 {
        self.inode_table_start() + self.inode_table_blocks()
    }

    #[inline]
    pub fn bitmap_block(&self) -> u32 {
        self.block_count.saturating_sub(1)
    }

    /// Blocks tracked by the bitmap (every block but the bitmap itself).
    #[inline]
    pub fn tracked_blocks(&self) -> u32 {
        self.bitmap_block()
    }

    pub fn data_block_count(&self) -> u32 {
        self.bitmap_block().saturating_sub(self.first_data_block())
    }

    /// Checks that the layout is representable on disk.
    pub fn validate(&self) -> FsResult {
        crate::ensure!(
            self.block_size >= SFS_MIN_BLOCK_SIZE && self.block_size.is_power_of_two(),
            FsError::Invalid("Block size must be a power of two >= 64")
        );
        crate::ensure!(
            self.inode_count > 0 && self.inode_count <= u16::MAX as u32,
            FsError::Invalid("Inode count out of range")
        );
        crate::ensure!(
            self.direct_count > 0 && self.direct_count <= u16::MAX as u32,
            FsError::Invalid("Direct pointer count out of range")
        );
        crate::ensure!(self.max_open > 0, FsError::Invalid("Descriptor table is empty"));
        crate::ensure!(
            self.superblock_size() <= self.block_size as usize,
            FsError::Invalid("Root directory does not fit in block 0")
        );
        crate::ensure!(
            self.tracked_blocks() as u64 <= self.block_size as u64 * 8,
            FsError::Invalid("Bitmap does not fit in one block")
        );
        crate::ensure!(
            self.block_count > 2 && self.first_data_block() < self.bitmap_block(),
            FsError::Invalid("No room left for data blocks")
        );
        Ok(())
    }
}

impl FsMeta<u32> for SfsMeta {
    fn unit_size(&self) -> usize {
        self.block_size as usize
    }

    fn unit_offset(&self, unit: u32) -> u64 {
        unit as u64 * self.block_size as u64
    }

    fn first_data_unit(&self) -> u32 {
        self.first_data_block()
    }

    fn last_data_unit(&self) -> u32 {
        self.bitmap_block() - 1
    }

    fn size_bytes(&self) -> u64 {
        self.block_count as u64 * self.block_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let meta = SfsMeta::default();
        meta.validate().unwrap();

        assert_eq!(meta.inode_size(), 64);
        assert_eq!(meta.superblock_size(), 1024);
        assert_eq!(meta.inode_table_blocks(), 4);
        assert_eq!(meta.first_data_block(), 5);
        assert_eq!(meta.bitmap_block(), 1025);
        assert_eq!(meta.data_block_count(), 1020);
        assert_eq!(meta.capacity_per_inode(), 14 * 1024);
        assert_eq!(meta.size_bytes(), 1026 * 1024);
        assert!(meta.is_valid_unit(5));
        assert!(!meta.is_valid_unit(4));
        assert!(!meta.is_valid_unit(1025));
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let too_many_inodes = SfsMeta::new_custom(1024, 1026, 64, 14, 32);
        assert_eq!(
            too_many_inodes.validate(),
            Err(FsError::Invalid("Root directory does not fit in block 0"))
        );

        let bitmap_overflow = SfsMeta::new_custom(64, 600, 3, 2, 4);
        assert_eq!(
            bitmap_overflow.validate(),
            Err(FsError::Invalid("Bitmap does not fit in one block"))
        );

        let no_data = SfsMeta::new_custom(64, 3, 3, 2, 4);
        assert!(no_data.validate().is_err());

        let odd_block = SfsMeta::new_custom(1000, 1026, 8, 14, 32);
        assert!(odd_block.validate().is_err());

        let no_fds = SfsMeta::new_custom(1024, 1026, 63, 14, 0);
        assert!(no_fds.validate().is_err());
    }

    #[cfg(feature = "mem")]
    #[test]
    fn test_meta_from_io() {
        use sfsio::prelude::MemBlockIO;

        let meta = SfsMeta::new_custom(128, 40, 7, 2, 4);
        let mut buf = vec![0u8; meta.size_bytes() as usize];
        let mut io = MemBlockIO::new(&mut buf);
        io.write_struct(0, &SfsSuperblockHeader::new(&meta)).unwrap();

        let read = SfsMeta::from_io(&mut io).unwrap();
        assert_eq!(read.block_size, 128);
        assert_eq!(read.block_count, 40);
        assert_eq!(read.inode_count, 7);
        assert_eq!(read.direct_count, 2);
        assert_eq!(read.max_open, SFS_DEFAULT_MAX_OPEN);

        let mut blank = vec![0u8; 256];
        let mut io = MemBlockIO::new(&mut blank);
        assert_eq!(
            SfsMeta::from_io(&mut io),
            Err(FsError::Invalid("Bad superblock magic"))
        );
    }
}
