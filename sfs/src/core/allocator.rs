// SPDX-License-Identifier: MIT

pub use crate::core::errors::{FsAllocatorError, FsAllocatorResult};

/// Trait for managing allocation of logical units in a filesystem.
///
/// Implemented for data blocks (bitmap backed) and for inode slots.
pub trait FsAllocator<Unit: Copy> {
    /// Reserve the first free unit and return it.
    fn allocate_unit(&mut self) -> FsAllocatorResult<Unit>;

    /// Return a unit to the free pool. Releasing a free unit is a no-op.
    fn release_unit(&mut self, unit: Unit);

    /// Number of units currently used.
    fn used_units(&self) -> usize;

    /// Number of remaining units.
    fn remaining_units(&self) -> usize;
}
