// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use crate::core::allocator::{FsAllocator, FsAllocatorError, FsAllocatorResult};
use crate::core::utils::bitmap::BitmapOps;
use crate::fs::meta::SfsMeta;

/// Free-space bitmap over device blocks.
///
/// Bit `i` tracks block `i`; the bitmap block itself is not tracked.
/// Blocks below `first_data_block` are reserved and stay allocated.
#[derive(Debug, Clone)]
pub struct SfsBlockAllocator {
    bits: Vec<u8>,
    tracked: u32,
    reserved: u32,
}

impl SfsBlockAllocator {
    /// Fresh bitmap: only the superblock and inode table blocks are in use.
    pub fn new(meta: &SfsMeta) -> Self {
        let mut alloc = Self {
            bits: vec![0u8; meta.block_size as usize],
            tracked: meta.tracked_blocks(),
            reserved: meta.first_data_block(),
        };
        for block in 0..alloc.reserved {
            alloc.bits.set_bit(block as usize, true);
        }
        alloc
    }

    /// Loads the bitmap from the raw content of the bitmap block.
    pub fn from_block(meta: &SfsMeta, block: &[u8]) -> Self {
        let mut bits = vec![0u8; meta.block_size as usize];
        let len = bits.len().min(block.len());
        bits[..len].copy_from_slice(&block[..len]);
        Self {
            bits,
            tracked: meta.tracked_blocks(),
            reserved: meta.first_data_block(),
        }
    }

    /// Raw bitmap block content.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Marks `block` allocated. Out-of-range indices are ignored.
    pub fn set(&mut self, block: u32) {
        if block < self.tracked {
            self.bits.set_bit(block as usize, true);
        }
    }

    /// Marks `block` free. Out-of-range and reserved indices are ignored.
    pub fn clear(&mut self, block: u32) {
        if block >= self.reserved && block < self.tracked {
            self.bits.set_bit(block as usize, false);
        }
    }

    /// Out-of-range indices read as allocated.
    #[inline]
    pub fn test(&self, block: u32) -> bool {
        block >= self.tracked || self.bits.get_bit(block as usize)
    }

    /// Lowest free data block.
    pub fn find_first_free(&self) -> Option<u32> {
        self.bits
            .find_first_zero(self.reserved as usize, self.tracked as usize)
            .map(|b| b as u32)
    }

    /// First-fit allocation.
    pub fn allocate(&mut self) -> FsAllocatorResult<u32> {
        let block = self.find_first_free().ok_or(FsAllocatorError::OutOfBlocks)?;
        self.set(block);
        Ok(block)
    }

    /// Set bits among the tracked blocks, reserved ones included.
    #[inline]
    pub fn allocated_count(&self) -> usize {
        self.bits.count_ones_in_range(0, self.tracked as usize)
    }
}

impl FsAllocator<u32> for SfsBlockAllocator {
    fn allocate_unit(&mut self) -> FsAllocatorResult<u32> {
        self.allocate()
    }

    fn release_unit(&mut self, unit: u32) {
        self.clear(unit);
    }

    fn used_units(&self) -> usize {
        self.bits
            .count_ones_in_range(self.reserved as usize, self.tracked as usize)
    }

    fn remaining_units(&self) -> usize {
        (self.tracked - self.reserved) as usize - self.used_units()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_meta() -> SfsMeta {
        // blocks 0..2 reserved, 2..39 data, 39 bitmap
        SfsMeta::new_custom(128, 40, 7, 2, 4)
    }

    #[test]
    fn test_reserved_blocks() {
        let alloc = SfsBlockAllocator::new(&SfsMeta::default());
        for block in 0..5 {
            assert!(alloc.test(block));
        }
        assert!(!alloc.test(5));
        assert_eq!(alloc.as_bytes()[0], 0b0001_1111);
        assert_eq!(alloc.allocated_count(), 5);
        assert_eq!(alloc.used_units(), 0);
        assert_eq!(alloc.remaining_units(), 1020);
    }

    #[test]
    fn test_first_fit() {
        let meta = small_meta();
        let mut alloc = SfsBlockAllocator::new(&meta);

        assert_eq!(alloc.allocate(), Ok(2));
        assert_eq!(alloc.allocate(), Ok(3));
        assert_eq!(alloc.allocate(), Ok(4));

        alloc.clear(3);
        assert_eq!(alloc.find_first_free(), Some(3));
        assert_eq!(alloc.allocate_unit(), Ok(3));
        assert_eq!(alloc.used_units(), 3);
    }

    #[test]
    fn test_exhaustion() {
        let meta = small_meta();
        let mut alloc = SfsBlockAllocator::new(&meta);

        for _ in 0..meta.data_block_count() {
            alloc.allocate().unwrap();
        }
        assert_eq!(alloc.remaining_units(), 0);
        assert_eq!(alloc.find_first_free(), None);
        assert_eq!(alloc.allocate(), Err(FsAllocatorError::OutOfBlocks));
    }

    #[test]
    fn test_out_of_range_and_reserved() {
        let meta = small_meta();
        let mut alloc = SfsBlockAllocator::new(&meta);

        // bitmap block and beyond read as allocated
        assert!(alloc.test(39));
        assert!(alloc.test(1000));

        alloc.set(1000);
        alloc.clear(0);
        alloc.release_unit(1);
        assert!(alloc.test(0));
        assert!(alloc.test(1));
        assert_eq!(alloc.allocated_count(), 2);
    }

    #[test]
    fn test_reload_from_block() {
        let meta = small_meta();
        let mut alloc = SfsBlockAllocator::new(&meta);
        alloc.set(10);
        alloc.set(20);

        let reloaded = SfsBlockAllocator::from_block(&meta, alloc.as_bytes());
        assert!(reloaded.test(10));
        assert!(reloaded.test(20));
        assert!(!reloaded.test(11));
        assert_eq!(reloaded.used_units(), 2);
    }
}
