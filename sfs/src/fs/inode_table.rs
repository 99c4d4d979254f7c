// SPDX-License-Identifier: MIT

//! Inode arena and chained addressing.
//!
//! A file is a chain of inodes: the head carries the size, every inode
//! addresses `direct_count` blocks, and `link` continues the sequence.
//! Byte offset `o` of a file lives in hop `o / capacity_per_inode` of the
//! chain, direct slot `(o % capacity_per_inode) / block_size`.

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use log::trace;

use crate::core::allocator::{FsAllocator, FsAllocatorError, FsAllocatorResult};
use crate::core::errors::{FsCursorError, FsCursorResult, FsResult};
use crate::fs::{allocator::SfsBlockAllocator, meta::SfsMeta, types::SfsInode};

#[derive(Debug, Clone)]
pub struct SfsInodeTable {
    inodes: Vec<SfsInode>,
    inode_size: usize,
    block_size: u64,
    direct_count: usize,
}

impl SfsInodeTable {
    /// All slots free.
    pub fn new(meta: &SfsMeta) -> Self {
        let direct_count = meta.direct_count as usize;
        Self {
            inodes: vec![SfsInode::free(direct_count); meta.inode_count as usize],
            inode_size: meta.inode_size(),
            block_size: meta.block_size as u64,
            direct_count,
        }
    }

    /// Parses the raw inode table region (records packed back to back).
    pub fn decode(meta: &SfsMeta, buf: &[u8]) -> Self {
        let direct_count = meta.direct_count as usize;
        let inode_size = meta.inode_size();
        let inodes = buf
            .chunks_exact(inode_size)
            .take(meta.inode_count as usize)
            .map(|rec| SfsInode::decode(rec, direct_count))
            .collect();
        Self {
            inodes,
            inode_size,
            block_size: meta.block_size as u64,
            direct_count,
        }
    }

    /// Serializes every record into `buf`, which must span the table region.
    pub fn encode(&self, buf: &mut [u8]) {
        for (inode, rec) in self.inodes.iter().zip(buf.chunks_exact_mut(self.inode_size)) {
            inode.encode_into(rec);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty()
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&SfsInode> {
        self.inodes.get(index as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, index: u32) -> Option<&mut SfsInode> {
        self.inodes.get_mut(index as usize)
    }

    /// Iterates `(index, inode)` over every slot.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &SfsInode)> {
        self.inodes.iter().enumerate().map(|(i, n)| (i as u32, n))
    }

    #[inline]
    pub fn capacity_per_inode(&self) -> u64 {
        self.direct_count as u64 * self.block_size
    }

    /// Size recorded in a live head inode.
    pub fn file_size(&self, head: u32) -> FsCursorResult<u32> {
        self.get(head)
            .filter(|i| !i.is_free())
            .map(|i| i.size)
            .ok_or(FsCursorError::BrokenLink(head))
    }

    pub fn find_unused_inode(&self) -> Option<u32> {
        self.inodes.iter().position(SfsInode::is_free).map(|i| i as u32)
    }

    /// Walks the chain starting at `head`.
    pub fn chain(&self, head: u32) -> SfsChain<'_> {
        SfsChain {
            table: self,
            next: Some(head),
            steps: 0,
            done: false,
        }
    }

    /// Chain member reached after `hops` links, or `None` if the chain is shorter.
    fn nth_in_chain(&self, head: u32, hops: u64) -> FsCursorResult<Option<u32>> {
        let mut chain = self.chain(head);
        let mut current = None;
        let mut hop = 0u64;
        while hop <= hops {
            match chain.next() {
                Some(step) => current = Some(step?),
                None => return Ok(None),
            }
            hop += 1;
        }
        Ok(current)
    }

    #[inline]
    fn split(&self, offset: u64) -> (u64, usize) {
        let capacity = self.capacity_per_inode();
        let hops = offset / capacity;
        let slot = ((offset % capacity) / self.block_size) as usize;
        (hops, slot)
    }

    /// Data block holding byte `offset` of the file rooted at `head`.
    pub fn locate_block(&self, head: u32, offset: u64) -> FsCursorResult<Option<u32>> {
        let (hops, slot) = self.split(offset);
        Ok(self
            .nth_in_chain(head, hops)?
            .and_then(|owner| self.inodes[owner as usize].block(slot)))
    }

    /// Inode whose direct slot covers byte `offset`. Allocates nothing.
    pub fn locate_owning_inode(&self, head: u32, offset: u64) -> FsCursorResult<Option<u32>> {
        let (hops, _) = self.split(offset);
        self.nth_in_chain(head, hops)
    }

    /// Like [`locate_owning_inode`](Self::locate_owning_inode), but appends
    /// fresh link inodes while the chain is too short.
    ///
    /// Returns the owning inode and the direct slot for `offset`.
    pub fn extend_to(&mut self, head: u32, offset: u64) -> FsResult<(u32, usize)> {
        let (hops, slot) = self.split(offset);

        let mut tail = head;
        let mut reached = 0u64;
        for step in self.chain(head) {
            tail = step?;
            if reached == hops {
                return Ok((tail, slot));
            }
            reached += 1;
        }

        while reached <= hops {
            let link = self.allocate_unit()?;
            self.inodes[tail as usize].link = link;
            trace!("sfs: chained link inode {link} after inode {tail}");
            tail = link;
            reached += 1;
        }
        Ok((tail, slot))
    }

    /// Records `block` in direct slot `slot` of `owner`.
    pub fn set_direct(&mut self, owner: u32, slot: usize, block: u32) {
        if let Some(ptr) = self
            .inodes
            .get_mut(owner as usize)
            .and_then(|i| i.direct.get_mut(slot))
        {
            *ptr = block;
        }
    }

    /// Frees a whole chain, tail first, clearing the bitmap bit of every
    /// referenced block. Returns the number of released blocks.
    ///
    /// The chain is validated before anything is modified.
    pub fn release_chain(
        &mut self,
        head: u32,
        bitmap: &mut SfsBlockAllocator,
    ) -> FsCursorResult<usize> {
        let members = self.chain(head).collect::<FsCursorResult<Vec<u32>>>()?;

        let mut released = 0;
        for &index in members.iter().rev() {
            let inode = &mut self.inodes[index as usize];
            for block in inode.blocks() {
                bitmap.clear(block);
                released += 1;
            }
            inode.reset();
        }
        trace!(
            "sfs: released chain at inode {head} ({} inodes, {released} blocks)",
            members.len()
        );
        Ok(released)
    }
}

impl FsAllocator<u32> for SfsInodeTable {
    /// Claims the first free slot as an empty inode.
    fn allocate_unit(&mut self) -> FsAllocatorResult<u32> {
        let index = self
            .find_unused_inode()
            .ok_or(FsAllocatorError::OutOfInodes)?;
        self.inodes[index as usize] = SfsInode::empty(self.direct_count);
        Ok(index)
    }

    /// Frees a single slot; block pointers are not released.
    fn release_unit(&mut self, unit: u32) {
        if let Some(inode) = self.inodes.get_mut(unit as usize) {
            inode.reset();
        }
    }

    fn used_units(&self) -> usize {
        self.inodes.iter().filter(|i| !i.is_free()).count()
    }

    fn remaining_units(&self) -> usize {
        self.len() - self.used_units()
    }
}

/// Iterator over the inode indices of one chain.
///
/// Yields `BrokenLink` for a free or out-of-range member, and `LoopDetected`
/// once more members were visited than the table holds. Stops after an error.
pub struct SfsChain<'a> {
    table: &'a SfsInodeTable,
    next: Option<u32>,
    steps: usize,
    done: bool,
}

impl Iterator for SfsChain<'_> {
    type Item = FsCursorResult<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let index = self.next?;
        if self.steps >= self.table.len() {
            self.done = true;
            return Some(Err(FsCursorError::LoopDetected));
        }
        let Some(inode) = self.table.get(index).filter(|i| !i.is_free()) else {
            self.done = true;
            return Some(Err(FsCursorError::BrokenLink(index)));
        };
        self.steps += 1;
        self.next = inode.link();
        Some(Ok(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::FsError;
    use crate::fs::constant::SFS_NONE;

    fn small_meta() -> SfsMeta {
        // 7 inodes, 2 direct pointers of 128 bytes: 256 bytes per inode
        SfsMeta::new_custom(128, 40, 7, 2, 4)
    }

    #[test]
    fn test_locate_direct_and_linked() {
        let meta = small_meta();
        let mut table = SfsInodeTable::new(&meta);
        let head = table.allocate_unit().unwrap();
        let link = table.allocate_unit().unwrap();
        table.get_mut(head).unwrap().link = link;
        table.set_direct(head, 0, 10);
        table.set_direct(head, 1, 11);
        table.set_direct(link, 0, 12);

        assert_eq!(table.locate_block(head, 0), Ok(Some(10)));
        assert_eq!(table.locate_block(head, 127), Ok(Some(10)));
        assert_eq!(table.locate_block(head, 128), Ok(Some(11)));
        assert_eq!(table.locate_block(head, 256), Ok(Some(12)));
        // slot 1 of the link inode is unset
        assert_eq!(table.locate_block(head, 384), Ok(None));
        // beyond the chain
        assert_eq!(table.locate_block(head, 512), Ok(None));

        assert_eq!(table.locate_owning_inode(head, 300), Ok(Some(link)));
        assert_eq!(table.locate_owning_inode(head, 600), Ok(None));
    }

    #[test]
    fn test_extend_to_appends_links() {
        let meta = small_meta();
        let mut table = SfsInodeTable::new(&meta);
        let head = table.allocate_unit().unwrap();

        assert_eq!(table.extend_to(head, 100).unwrap(), (head, 0));
        assert_eq!(table.used_units(), 1);

        let (owner, slot) = table.extend_to(head, 3 * 256 + 130).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(table.used_units(), 4);
        assert_eq!(table.chain(head).count(), 4);
        assert_eq!(table.locate_owning_inode(head, 3 * 256), Ok(Some(owner)));

        // link inodes are empty, not free
        let link = table.get(head).unwrap().link().unwrap();
        assert_eq!(table.get(link).unwrap().size, 0);
    }

    #[test]
    fn test_extend_to_out_of_inodes() {
        let meta = small_meta();
        let mut table = SfsInodeTable::new(&meta);
        let head = table.allocate_unit().unwrap();

        let err = table.extend_to(head, 7 * 256).unwrap_err();
        assert_eq!(err, FsError::from(FsAllocatorError::OutOfInodes));
        assert_eq!(table.remaining_units(), 0);
    }

    #[test]
    fn test_loop_detection() {
        let meta = small_meta();
        let mut table = SfsInodeTable::new(&meta);
        let a = table.allocate_unit().unwrap();
        let b = table.allocate_unit().unwrap();
        table.get_mut(a).unwrap().link = b;
        table.get_mut(b).unwrap().link = a;

        let walked: Vec<_> = table.chain(a).collect();
        assert_eq!(walked.len(), 8);
        assert_eq!(walked.last(), Some(&Err(FsCursorError::LoopDetected)));
        assert_eq!(
            table.locate_block(a, 10 * 256),
            Err(FsCursorError::LoopDetected)
        );
    }

    #[test]
    fn test_broken_link() {
        let meta = small_meta();
        let mut table = SfsInodeTable::new(&meta);
        let head = table.allocate_unit().unwrap();
        table.get_mut(head).unwrap().link = 5;

        assert_eq!(
            table.locate_block(head, 300),
            Err(FsCursorError::BrokenLink(5))
        );
        assert_eq!(table.file_size(6), Err(FsCursorError::BrokenLink(6)));
    }

    #[test]
    fn test_release_chain() {
        let meta = small_meta();
        let mut table = SfsInodeTable::new(&meta);
        let mut bitmap = SfsBlockAllocator::new(&meta);

        let head = table.allocate_unit().unwrap();
        for offset in [0u64, 128, 256, 384, 512] {
            let (owner, slot) = table.extend_to(head, offset).unwrap();
            let block = bitmap.allocate().unwrap();
            table.set_direct(owner, slot, block);
        }
        assert_eq!(table.used_units(), 3);
        assert_eq!(bitmap.used_units(), 5);

        assert_eq!(table.release_chain(head, &mut bitmap), Ok(5));
        assert_eq!(table.used_units(), 0);
        assert_eq!(bitmap.used_units(), 0);
        assert!(table.iter().all(|(_, i)| i.link == SFS_NONE && i.is_free()));
    }

    #[test]
    fn test_encode_decode_table() {
        let meta = SfsMeta::default();
        let mut table = SfsInodeTable::new(&meta);
        let head = table.allocate_unit().unwrap();
        table.get_mut(head).unwrap().size = 42;
        table.set_direct(head, 0, 5);

        let mut buf = vec![0u8; meta.inode_table_blocks() as usize * meta.block_size as usize];
        table.encode(&mut buf);
        let decoded = SfsInodeTable::decode(&meta, &buf);

        assert_eq!(decoded.len(), 63);
        assert_eq!(decoded.file_size(head), Ok(42));
        assert_eq!(decoded.locate_block(head, 0), Ok(Some(5)));
        assert_eq!(decoded.find_unused_inode(), Some(1));
    }
}
