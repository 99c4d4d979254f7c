// SPDX-License-Identifier: MIT

//! Superblock and flat root directory (block 0).

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use zerocopy::{FromBytes, FromZeros, IntoBytes};

use crate::fs::{
    constant::*,
    meta::SfsMeta,
    types::{SfsDirEntry, SfsSuperblockHeader},
};

#[derive(Debug, Clone)]
pub struct SfsDirectory {
    header: SfsSuperblockHeader,
    entries: Vec<SfsDirEntry>,
    /// Position of `next_used`, in entry slots.
    cursor: usize,
}

impl SfsDirectory {
    /// Empty root for a freshly formatted volume.
    pub fn new(meta: &SfsMeta) -> Self {
        Self {
            header: SfsSuperblockHeader::new(meta),
            entries: vec![SfsDirEntry::empty(); meta.inode_count as usize],
            cursor: 0,
        }
    }

    /// Parses block 0. The header is returned as found; callers check
    /// [`SfsSuperblockHeader::is_valid`] and [`SfsSuperblockHeader::matches`].
    pub fn decode(meta: &SfsMeta, block: &[u8]) -> Self {
        let header = SfsSuperblockHeader::read_from_prefix(block)
            .map(|(h, _)| h)
            .unwrap_or_else(|_| SfsSuperblockHeader::new_zeroed());
        let entries = block
            .get(SFS_SUPERBLOCK_HEADER_SIZE..)
            .unwrap_or_default()
            .chunks_exact(SFS_DIRENT_SIZE)
            .take(meta.inode_count as usize)
            .map(|raw| SfsDirEntry::read_from_bytes(raw).unwrap_or_default())
            .collect();
        Self {
            header,
            entries,
            cursor: 0,
        }
    }

    /// Serializes header and entries into the front of `block`.
    pub fn encode(&self, block: &mut [u8]) {
        block[..SFS_SUPERBLOCK_HEADER_SIZE].copy_from_slice(self.header.as_bytes());
        let table = &mut block[SFS_SUPERBLOCK_HEADER_SIZE..];
        for (entry, raw) in self
            .entries
            .iter()
            .zip(table.chunks_exact_mut(SFS_DIRENT_SIZE))
        {
            raw.copy_from_slice(entry.as_bytes());
        }
    }

    #[inline]
    pub fn header(&self) -> &SfsSuperblockHeader {
        &self.header
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn entry(&self, slot: usize) -> Option<&SfsDirEntry> {
        self.entries.get(slot)
    }

    /// Finds a populated entry by exact (bounded) name.
    pub fn lookup(&self, name: &[u8]) -> Option<(usize, u32)> {
        self.entries
            .iter()
            .position(|e| e.matches(name))
            .map(|slot| (slot, self.entries[slot].inode()))
    }

    pub fn find_free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.is_used())
    }

    pub fn bind(&mut self, slot: usize, name: &[u8], inode: u32) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = SfsDirEntry::new(name, inode);
        }
    }

    pub fn unbind(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = SfsDirEntry::empty();
        }
    }

    /// Iterates `(slot, entry)` over populated entries.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SfsDirEntry)> {
        self.entries.iter().enumerate().filter(|(_, e)| e.is_used())
    }

    pub fn used_count(&self) -> usize {
        self.iter().count()
    }

    /// Steps the enumeration cursor to the next populated slot.
    ///
    /// Returns `None` once after the last one, then starts over.
    pub fn next_used(&mut self) -> Option<usize> {
        while self.cursor < self.entries.len() {
            let slot = self.cursor;
            self.cursor += 1;
            if self.entries[slot].is_used() {
                return Some(slot);
            }
        }
        self.cursor = 0;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_lookup_unbind() {
        let meta = SfsMeta::default();
        let mut dir = SfsDirectory::new(&meta);
        assert_eq!(dir.slot_count(), 63);
        assert_eq!(dir.find_free_slot(), Some(0));

        dir.bind(0, b"a.txt", 4);
        dir.bind(1, b"b.txt", 9);
        assert_eq!(dir.lookup(b"b.txt"), Some((1, 9)));
        assert_eq!(dir.lookup(b"b.tx"), None);
        assert_eq!(dir.find_free_slot(), Some(2));
        assert_eq!(dir.used_count(), 2);

        dir.unbind(0);
        assert_eq!(dir.lookup(b"a.txt"), None);
        assert_eq!(dir.find_free_slot(), Some(0));
    }

    #[test]
    fn test_block_encoding() {
        let meta = SfsMeta::default();
        let mut dir = SfsDirectory::new(&meta);
        dir.bind(62, b"last", 0);

        let mut block = vec![0u8; meta.block_size as usize];
        dir.encode(&mut block);
        assert_eq!(&block[0..4], &SFS_MAGIC.to_le_bytes());
        assert_eq!(&block[1008..1012], b"last");
        assert_eq!(&block[1020..1024], &0u32.to_le_bytes());
        // empty entries carry the "none" inode
        assert_eq!(&block[28..32], &SFS_NONE.to_le_bytes());

        let decoded = SfsDirectory::decode(&meta, &block);
        assert!(decoded.header().is_valid());
        assert!(decoded.header().matches(&meta));
        assert_eq!(decoded.lookup(b"last"), Some((62, 0)));
        assert_eq!(decoded.used_count(), 1);
    }

    #[test]
    fn test_next_used_wraps() {
        let meta = SfsMeta::default();
        let mut dir = SfsDirectory::new(&meta);
        dir.bind(3, b"x", 0);
        dir.bind(10, b"y", 1);

        assert_eq!(dir.next_used(), Some(3));
        assert_eq!(dir.next_used(), Some(10));
        assert_eq!(dir.next_used(), None);
        assert_eq!(dir.next_used(), Some(3));
    }

    #[test]
    fn test_decode_blank_block() {
        let meta = SfsMeta::default();
        let dir = SfsDirectory::decode(&meta, &[0u8; 1024]);
        assert!(!dir.header().is_valid());
        assert_eq!(dir.used_count(), 0);
    }
}
