// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use crate::core::allocator::{FsAllocator, FsAllocatorError, FsAllocatorResult};
use crate::core::errors::{FsError, FsResult};
use crate::fs::constant::*;

/// Open-file handle, memory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SfsDescriptor {
    pub name: [u8; SFS_NAME_FIELD_LEN],
    /// Head inode of the open file, `None` when the slot is closed.
    pub inode: Option<u32>,
    pub read_cursor: u64,
    pub write_cursor: u64,
}

impl SfsDescriptor {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.inode.is_some()
    }

    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(SFS_MAX_NAME_LEN);
        &self.name[..end]
    }
}

/// Fixed-capacity descriptor table. Descriptors are plain slot indices.
#[derive(Debug, Clone)]
pub struct SfsDescriptorTable {
    slots: Vec<SfsDescriptor>,
}

impl SfsDescriptorTable {
    pub fn new(max_open: usize) -> Self {
        Self {
            slots: vec![SfsDescriptor::default(); max_open],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_open(&self, fd: usize) -> bool {
        self.slots.get(fd).is_some_and(SfsDescriptor::is_open)
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|d| d.is_open()).count()
    }

    /// Open descriptor `fd`, or `BadHandle`.
    pub fn get(&self, fd: usize) -> FsResult<&SfsDescriptor> {
        self.slots
            .get(fd)
            .filter(|d| d.is_open())
            .ok_or(FsError::BadHandle(fd))
    }

    pub fn get_mut(&mut self, fd: usize) -> FsResult<&mut SfsDescriptor> {
        self.slots
            .get_mut(fd)
            .filter(|d| d.is_open())
            .ok_or(FsError::BadHandle(fd))
    }

    /// Head inode bound to `fd`.
    pub fn inode_of(&self, fd: usize) -> FsResult<u32> {
        self.get(fd)?.inode.ok_or(FsError::BadHandle(fd))
    }

    /// Binds slot `fd` to an open file: reads start at 0, writes append at `size`.
    pub fn bind(&mut self, fd: usize, name: &[u8], inode: u32, size: u64) {
        if let Some(slot) = self.slots.get_mut(fd) {
            let mut field = [0u8; SFS_NAME_FIELD_LEN];
            let len = name.len().min(SFS_MAX_NAME_LEN);
            field[..len].copy_from_slice(&name[..len]);
            *slot = SfsDescriptor {
                name: field,
                inode: Some(inode),
                read_cursor: 0,
                write_cursor: size,
            };
        }
    }

    /// Closes `fd`; fails with `BadHandle` if it is not open.
    pub fn release(&mut self, fd: usize) -> FsResult {
        *self.get_mut(fd)? = SfsDescriptor::default();
        Ok(())
    }

    /// Closes every descriptor bound to `inode`. Returns how many were closed.
    pub fn invalidate_inode(&mut self, inode: u32) -> usize {
        let mut closed = 0;
        for slot in self.slots.iter_mut().filter(|d| d.inode == Some(inode)) {
            *slot = SfsDescriptor::default();
            closed += 1;
        }
        closed
    }
}

impl FsAllocator<usize> for SfsDescriptorTable {
    /// Finds the first closed slot. It stays closed until [`SfsDescriptorTable::bind`].
    fn allocate_unit(&mut self) -> FsAllocatorResult<usize> {
        self.slots
            .iter()
            .position(|d| !d.is_open())
            .ok_or(FsAllocatorError::OutOfDescriptors)
    }

    fn release_unit(&mut self, unit: usize) {
        if let Some(slot) = self.slots.get_mut(unit) {
            *slot = SfsDescriptor::default();
        }
    }

    fn used_units(&self) -> usize {
        self.open_count()
    }

    fn remaining_units(&self) -> usize {
        self.capacity() - self.open_count()
    }
}
