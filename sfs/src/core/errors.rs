// SPDX-License-Identifier: MIT

use core::fmt;

pub use sfsio::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAllocatorError {
    OutOfBlocks,
    OutOfInodes,
    OutOfEntries,
    OutOfDescriptors,
    Other(&'static str),
}

impl FsAllocatorError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsAllocatorError::OutOfBlocks => "Out of data blocks",
            FsAllocatorError::OutOfInodes => "Out of inodes",
            FsAllocatorError::OutOfEntries => "Out of directory entries",
            FsAllocatorError::OutOfDescriptors => "Out of file descriptors",
            FsAllocatorError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsAllocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}

/// Errors raised while walking an inode chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsCursorError {
    /// The byte offset maps to a direct slot that was never assigned a block.
    Unallocated(u64),
    /// An inode link points outside the table or at a free inode.
    BrokenLink(u32),
    LoopDetected,
    Other(&'static str),
}

impl FsCursorError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsCursorError::Unallocated(_) => "Offset maps to an unallocated block",
            FsCursorError::BrokenLink(_) => "Broken inode link",
            FsCursorError::LoopDetected => "Loop detected in inode chain",
            FsCursorError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsCursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            FsCursorError::Unallocated(offset) => write!(f, " (offset: {offset})")?,
            FsCursorError::BrokenLink(inode) => write!(f, " (inode: {inode})")?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFormatterError {
    IO(BlockIOError),
    Invalid(&'static str),
    Other(&'static str),
}

impl FsFormatterError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsFormatterError::IO(_) => "IO error",
            FsFormatterError::Invalid(msg) => msg,
            FsFormatterError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsFormatterError::IO(e) => Some(FsError::IO(*e)),
            _ => None,
        }
    }
}

impl fmt::Display for FsFormatterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsCheckerError {
    IO(BlockIOError),
    Cursor(FsCursorError),
    Invalid(&'static str),
    Other(&'static str),
}

impl FsCheckerError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsCheckerError::IO(_) => "IO error",
            FsCheckerError::Cursor(_) => "Cursor error",
            FsCheckerError::Invalid(msg) => msg,
            FsCheckerError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsCheckerError::IO(e) => Some(FsError::IO(*e)),
            FsCheckerError::Cursor(e) => Some(FsError::Cursor(*e)),
            _ => None,
        }
    }
}

impl fmt::Display for FsCheckerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

/// Coarse classification of [`FsError`], stable across refactors of the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    /// Bad offset, bad handle, bad name or geometry.
    InvalidArgument,
    /// No free inode, data block, directory slot or descriptor.
    ResourceExhausted,
    NotFound,
    /// A read reached a logical offset whose block was never written.
    UnallocatedRegion,
    /// The block device could not be created, opened, read or written.
    DeviceFailure,
    /// On-disk metadata is inconsistent.
    Corrupted,
}

/// Top-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IO(BlockIOError),
    Allocator(FsAllocatorError),
    Cursor(FsCursorError),
    Formatter(FsFormatterError),
    Checker(FsCheckerError),
    Invalid(&'static str),
    /// Descriptor index out of range or not open.
    BadHandle(usize),
    NotFound,
    Other(&'static str),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        if let FsError::BadHandle(fd) = self {
            write!(f, " (fd: {fd})")?;
        }
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::IO(e) => e.msg(),
            FsError::Allocator(e) => e.msg(),
            FsError::Cursor(e) => e.msg(),
            FsError::Formatter(e) => e.msg(),
            FsError::Checker(e) => e.msg(),
            FsError::Invalid(msg) => msg,
            FsError::BadHandle(_) => "Bad file descriptor",
            FsError::NotFound => "File not found",
            FsError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsError::Formatter(e) => e.source(),
            FsError::Checker(e) => e.source(),
            _ => None,
        }
    }

    pub fn kind(&self) -> FsErrorKind {
        match self {
            FsError::IO(_) => FsErrorKind::DeviceFailure,
            FsError::Allocator(FsAllocatorError::Other(_)) => FsErrorKind::Corrupted,
            FsError::Allocator(_) => FsErrorKind::ResourceExhausted,
            FsError::Cursor(FsCursorError::Unallocated(_)) => FsErrorKind::UnallocatedRegion,
            FsError::Cursor(_) => FsErrorKind::Corrupted,
            FsError::Formatter(FsFormatterError::IO(_)) => FsErrorKind::DeviceFailure,
            FsError::Formatter(_) => FsErrorKind::InvalidArgument,
            FsError::Checker(FsCheckerError::IO(_)) => FsErrorKind::DeviceFailure,
            FsError::Checker(_) => FsErrorKind::Corrupted,
            FsError::Invalid(_) | FsError::BadHandle(_) => FsErrorKind::InvalidArgument,
            FsError::NotFound => FsErrorKind::NotFound,
            FsError::Other(_) => FsErrorKind::Corrupted,
        }
    }
}

// === type Fs*Result ===

pub type FsResult<T = ()> = Result<T, FsError>;
pub type FsAllocatorResult<T = ()> = Result<T, FsAllocatorError>;
pub type FsCursorResult<T = ()> = Result<T, FsCursorError>;
pub type FsFormatterResult<T = ()> = Result<T, FsFormatterError>;
pub type FsCheckerResult<T = ()> = Result<T, FsCheckerError>;

crate::fs_error_wiring! {
    top => FsError {
        BlockIOError     : IO,
        FsAllocatorError : Allocator,
        FsCursorError    : Cursor,
        FsFormatterError : Formatter,
        FsCheckerError   : Checker,
    },
    str_into => [
        FsAllocatorError,
        FsCursorError,
        FsFormatterError,
        FsCheckerError,
    ],
    sub => {
        BlockIOError  => [ FsFormatterError::IO, FsCheckerError::IO ],
        FsCursorError => [ FsCheckerError::Cursor ],
    },
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_display() {
        let low = BlockIOError::OutOfBounds;
        let fmt = FsFormatterError::from(low);
        let top = FsError::from(fmt);

        let text = top.to_string();
        assert!(text.starts_with("IO error"));
        assert!(text.contains("caused by: Out of bounds"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FsError::from(FsAllocatorError::OutOfInodes).kind(),
            FsErrorKind::ResourceExhausted
        );
        assert_eq!(
            FsError::from(FsCursorError::Unallocated(4096)).kind(),
            FsErrorKind::UnallocatedRegion
        );
        assert_eq!(
            FsError::from(FsFormatterError::IO(BlockIOError::Unsupported)).kind(),
            FsErrorKind::DeviceFailure
        );
        assert_eq!(FsError::BadHandle(40).kind(), FsErrorKind::InvalidArgument);
        assert_eq!(FsError::NotFound.kind(), FsErrorKind::NotFound);
        assert_eq!(FsError::from("boom"), FsError::Other("boom"));
    }

    #[test]
    fn test_cursor_error_display() {
        let e = FsCursorError::BrokenLink(7);
        assert_eq!(e.to_string(), "Broken inode link (inode: 7)");
    }
}
