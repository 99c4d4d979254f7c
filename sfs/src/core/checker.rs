// SPDX-License-Identifier: MIT

pub use crate::core::errors::{FsCheckerError, FsCheckerResult};

/// Trait for verifying the integrity of a filesystem.
///
/// Cross-checks the allocation bitmap, inode chains and directory against each other.
pub trait FsChecker {
    /// Summary produced by a full pass.
    type Report;

    /// Runs every check and collects the findings without failing.
    fn scan(&mut self) -> FsCheckerResult<Self::Report>;

    /// Runs all available checks on the filesystem.
    ///
    /// Returns the report if all checks pass, or an error detailing the first failure encountered.
    fn check_all(&mut self) -> FsCheckerResult<Self::Report>;
}
