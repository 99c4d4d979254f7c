// SPDX-License-Identifier: MIT

//! Offline consistency check of the persisted metadata.

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use core::fmt;

use log::{debug, warn};
use sfsio::{BlockIO, device::BlockDevice};

use crate::core::checker::*;
use crate::core::errors::FsCursorError;
use crate::core::traits::{FsChecker, FsMeta};
use crate::core::utils::bitmap::BitmapOps;
use crate::fs::{meta::SfsMeta, volume::read_layout};

/// A single inconsistency found by [`SfsChecker::scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SfsIssue {
    /// Root entry bound to a free or out-of-range inode.
    DanglingEntry { slot: usize, inode: u32 },
    /// Two root entries with the same name.
    DuplicateName { slot: usize },
    /// Chain walk failed (loop or broken link).
    BrokenChain { head: u32, cause: FsCursorError },
    /// Inode reached twice (shared between chains, or a cycle).
    SharedInode { inode: u32 },
    /// Pointer outside the data region.
    BlockOutOfRange { inode: u32, block: u32 },
    /// Referenced block left free in the bitmap.
    BlockNotMarked { block: u32 },
    /// Block referenced twice.
    BlockShared { block: u32 },
    /// Offset inside the file size with no block behind it.
    Hole { head: u32, offset: u64 },
    /// Live inode not reachable from any entry.
    OrphanInode { inode: u32 },
    /// Block marked allocated without a reference.
    LeakedBlock { block: u32 },
    /// Reserved metadata block marked free.
    ReservedBlockFree { block: u32 },
}

impl SfsIssue {
    pub fn msg(&self) -> &'static str {
        match self {
            SfsIssue::DanglingEntry { .. } => "Root entry points at a free inode",
            SfsIssue::DuplicateName { .. } => "Duplicate file name",
            SfsIssue::BrokenChain { .. } => "Broken inode chain",
            SfsIssue::SharedInode { .. } => "Inode linked more than once",
            SfsIssue::BlockOutOfRange { .. } => "Block pointer outside the data region",
            SfsIssue::BlockNotMarked { .. } => "Referenced block is free in the bitmap",
            SfsIssue::BlockShared { .. } => "Block referenced twice",
            SfsIssue::Hole { .. } => "Unallocated block inside file size",
            SfsIssue::OrphanInode { .. } => "Unreachable inode",
            SfsIssue::LeakedBlock { .. } => "Leaked block",
            SfsIssue::ReservedBlockFree { .. } => "Reserved block is free in the bitmap",
        }
    }
}

impl fmt::Display for SfsIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            SfsIssue::DanglingEntry { slot, inode } => write!(f, " (slot {slot}, inode {inode})"),
            SfsIssue::DuplicateName { slot } => write!(f, " (slot {slot})"),
            SfsIssue::BrokenChain { head, cause } => write!(f, " (head {head}: {cause})"),
            SfsIssue::SharedInode { inode } | SfsIssue::OrphanInode { inode } => {
                write!(f, " (inode {inode})")
            }
            SfsIssue::BlockOutOfRange { inode, block } => {
                write!(f, " (inode {inode}, block {block})")
            }
            SfsIssue::BlockNotMarked { block }
            | SfsIssue::BlockShared { block }
            | SfsIssue::LeakedBlock { block }
            | SfsIssue::ReservedBlockFree { block } => write!(f, " (block {block})"),
            SfsIssue::Hole { head, offset } => write!(f, " (head {head}, offset {offset})"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfsCheckReport {
    pub files: usize,
    /// Non-free inodes, heads and links.
    pub inodes_used: usize,
    pub link_inodes: usize,
    /// Data blocks referenced by some chain.
    pub blocks_used: usize,
    pub issues: Vec<SfsIssue>,
}

impl SfsCheckReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Cross-checks superblock, root directory, inode chains and bitmap as
/// stored on the device.
pub struct SfsChecker<'a, IO: BlockIO> {
    device: &'a mut BlockDevice<IO>,
    meta: &'a SfsMeta,
}

impl<'a, IO: BlockIO> SfsChecker<'a, IO> {
    pub fn new(device: &'a mut BlockDevice<IO>, meta: &'a SfsMeta) -> Self {
        Self { device, meta }
    }
}

impl<IO: BlockIO> FsChecker for SfsChecker<'_, IO> {
    type Report = SfsCheckReport;

    fn scan(&mut self) -> FsCheckerResult<SfsCheckReport> {
        let meta = self.meta;
        let layout = read_layout(self.device, meta)?;
        let header = layout.directory.header();
        if !header.is_valid() {
            return Err(FsCheckerError::Invalid("Bad superblock magic"));
        }
        if !header.matches(meta) {
            return Err(FsCheckerError::Invalid("Volume geometry does not match"));
        }

        let mut report = SfsCheckReport::default();
        let mut seen_inodes = vec![0u8; (meta.inode_count as usize).div_ceil(8)];
        let mut seen_blocks = vec![0u8; (meta.block_count as usize).div_ceil(8)];
        let block_size = meta.block_size as u64;

        for (slot, entry) in layout.directory.iter() {
            report.files += 1;
            let head = entry.inode();

            if layout
                .directory
                .iter()
                .take_while(|(s, _)| *s < slot)
                .any(|(_, other)| other.name_bytes() == entry.name_bytes())
            {
                report.issues.push(SfsIssue::DuplicateName { slot });
            }

            let Ok(size) = layout.inodes.file_size(head) else {
                report
                    .issues
                    .push(SfsIssue::DanglingEntry { slot, inode: head });
                continue;
            };

            for step in layout.inodes.chain(head) {
                let index = match step {
                    Ok(index) => index,
                    Err(cause) => {
                        report.issues.push(SfsIssue::BrokenChain { head, cause });
                        break;
                    }
                };
                if seen_inodes.get_bit(index as usize) {
                    report.issues.push(SfsIssue::SharedInode { inode: index });
                    break;
                }
                seen_inodes.set_bit(index as usize, true);
                if index != head {
                    report.link_inodes += 1;
                }

                let Some(inode) = layout.inodes.get(index) else {
                    continue;
                };
                for block in inode.blocks() {
                    if !meta.is_valid_unit(block) {
                        report
                            .issues
                            .push(SfsIssue::BlockOutOfRange { inode: index, block });
                        continue;
                    }
                    if seen_blocks.get_bit(block as usize) {
                        report.issues.push(SfsIssue::BlockShared { block });
                        continue;
                    }
                    seen_blocks.set_bit(block as usize, true);
                    report.blocks_used += 1;
                    if !layout.bitmap.test(block) {
                        report.issues.push(SfsIssue::BlockNotMarked { block });
                    }
                }
            }

            let mut offset = 0u64;
            while offset < size as u64 {
                match layout.inodes.locate_block(head, offset) {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        report.issues.push(SfsIssue::Hole { head, offset });
                        break;
                    }
                    // already reported by the chain walk
                    Err(_) => break,
                }
                offset += block_size;
            }
        }

        for (index, inode) in layout.inodes.iter() {
            if inode.is_free() {
                continue;
            }
            report.inodes_used += 1;
            if !seen_inodes.get_bit(index as usize) {
                report.issues.push(SfsIssue::OrphanInode { inode: index });
            }
        }

        for block in 0..meta.first_data_block() {
            if !layout.bitmap.test(block) {
                report.issues.push(SfsIssue::ReservedBlockFree { block });
            }
        }
        for block in meta.first_data_unit()..=meta.last_data_unit() {
            if layout.bitmap.test(block) && !seen_blocks.get_bit(block as usize) {
                report.issues.push(SfsIssue::LeakedBlock { block });
            }
        }

        debug!(
            "sfs: check scanned {} files, {} inodes, {} blocks, {} issues",
            report.files,
            report.inodes_used,
            report.blocks_used,
            report.issues.len()
        );
        Ok(report)
    }

    fn check_all(&mut self) -> FsCheckerResult<SfsCheckReport> {
        let report = self.scan()?;
        if let Some(issue) = report.issues.first() {
            warn!("sfs: check failed: {issue}");
            return Err(FsCheckerError::Invalid(issue.msg()));
        }
        Ok(report)
    }
}
