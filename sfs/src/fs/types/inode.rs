// SPDX-License-Identifier: MIT
//! SFS inode record

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use crate::fs::constant::*;

/// In-memory inode.
///
/// On disk: `size u32 | link u32 | direct [u32; direct_count]`, little-endian.
/// The record length depends on the volume geometry, so it is encoded by hand
/// instead of through a packed struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfsInode {
    /// File size in bytes, or `SFS_INODE_FREE`.
    pub size: u32,
    /// Continuation inode, or `SFS_NONE`.
    pub link: u32,
    pub direct: Vec<u32>,
}

#[inline]
fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

impl SfsInode {
    /// Unused slot.
    pub fn free(direct_count: usize) -> Self {
        Self {
            size: SFS_INODE_FREE,
            link: SFS_NONE,
            direct: vec![SFS_NONE; direct_count],
        }
    }

    /// Claimed slot with no blocks (new file or fresh link inode).
    pub fn empty(direct_count: usize) -> Self {
        Self {
            size: 0,
            ..Self::free(direct_count)
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.size == SFS_INODE_FREE
    }

    #[inline]
    pub fn link(&self) -> Option<u32> {
        (self.link != SFS_NONE).then_some(self.link)
    }

    /// Block recorded in direct slot `slot`, if any.
    #[inline]
    pub fn block(&self, slot: usize) -> Option<u32> {
        self.direct
            .get(slot)
            .copied()
            .filter(|&b| b != SFS_NONE)
    }

    pub fn blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct.iter().copied().filter(|&b| b != SFS_NONE)
    }

    /// Marks the slot unused again.
    pub fn reset(&mut self) {
        self.size = SFS_INODE_FREE;
        self.link = SFS_NONE;
        self.direct.fill(SFS_NONE);
    }

    /// Writes the record into the front of `buf`.
    pub fn encode_into(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.size.to_le_bytes());
        buf[4..8].copy_from_slice(&self.link.to_le_bytes());
        for (i, block) in self.direct.iter().enumerate() {
            let off = SFS_INODE_HEADER_SIZE + i * SFS_POINTER_SIZE;
            buf[off..off + SFS_POINTER_SIZE].copy_from_slice(&block.to_le_bytes());
        }
    }

    /// Parses one record from the front of `buf`.
    pub fn decode(buf: &[u8], direct_count: usize) -> Self {
        let direct = (0..direct_count)
            .map(|i| read_u32(buf, SFS_INODE_HEADER_SIZE + i * SFS_POINTER_SIZE))
            .collect();
        Self {
            size: read_u32(buf, 0),
            link: read_u32(buf, 4),
            direct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inode_encoding() {
        let mut inode = SfsInode::empty(14);
        inode.size = 20000;
        inode.link = 9;
        inode.direct[0] = 5;
        inode.direct[13] = 18;

        let mut buf = [0u8; 64];
        inode.encode_into(&mut buf);
        assert_eq!(&buf[0..4], &20000u32.to_le_bytes());
        assert_eq!(&buf[4..8], &9u32.to_le_bytes());
        assert_eq!(&buf[8..12], &5u32.to_le_bytes());
        assert_eq!(&buf[12..16], &SFS_NONE.to_le_bytes());
        assert_eq!(&buf[60..64], &18u32.to_le_bytes());

        assert_eq!(SfsInode::decode(&buf, 14), inode);
    }

    #[test]
    fn test_free_and_reset() {
        let mut inode = SfsInode::empty(4);
        assert!(!inode.is_free());
        assert_eq!(inode.link(), None);
        assert_eq!(inode.block(0), None);

        inode.direct[1] = 7;
        inode.link = 3;
        assert_eq!(inode.block(1), Some(7));
        assert_eq!(inode.link(), Some(3));
        assert_eq!(inode.blocks().collect::<Vec<_>>(), vec![7]);

        inode.reset();
        assert!(inode.is_free());
        assert_eq!(inode, SfsInode::free(4));
    }
}
