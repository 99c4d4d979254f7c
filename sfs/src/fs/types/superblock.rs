// SPDX-License-Identifier: MIT
//! SFS superblock header

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::fs::{constant::*, meta::SfsMeta};

/// Superblock header (16 bytes), stored at the start of block 0.
///
/// The root directory entries follow it in the same block.
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct SfsSuperblockHeader {
    /// Magic signature (`SFS_MAGIC`)
    pub s_magic: u32,
    pub s_block_size: u32,
    pub s_block_count: u32,
    pub s_inode_count: u16,
    /// Direct pointers per inode
    pub s_direct_count: u16,
}

impl SfsSuperblockHeader {
    pub fn new(meta: &SfsMeta) -> Self {
        Self {
            s_magic: SFS_MAGIC,
            s_block_size: meta.block_size,
            s_block_count: meta.block_count,
            s_inode_count: meta.inode_count as u16,
            s_direct_count: meta.direct_count as u16,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        let magic = self.s_magic;
        magic == SFS_MAGIC
    }

    /// True when the recorded geometry is the one described by `meta`.
    pub fn matches(&self, meta: &SfsMeta) -> bool {
        let (bs, bc) = (self.s_block_size, self.s_block_count);
        let (ic, dc) = (self.s_inode_count, self.s_direct_count);
        bs == meta.block_size
            && bc == meta.block_count
            && ic as u32 == meta.inode_count
            && dc as u32 == meta.direct_count
    }
}
