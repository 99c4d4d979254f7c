// SPDX-License-Identifier: MIT
//! SFS root directory entry

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    core::{FsError, FsResult},
    fs::constant::*,
};

/// Root directory entry (16 bytes).
///
/// Either fully empty (zeroed name, `inode == SFS_NONE`) or fully populated.
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct SfsDirEntry {
    /// NUL-terminated name
    pub name: [u8; SFS_NAME_FIELD_LEN],
    pub inode: u32,
}

impl Default for SfsDirEntry {
    fn default() -> Self {
        Self::empty()
    }
}

impl SfsDirEntry {
    pub const fn empty() -> Self {
        Self {
            name: [0; SFS_NAME_FIELD_LEN],
            inode: SFS_NONE,
        }
    }

    /// Builds a populated entry. `name` must already be bounded (see [`bound_name`]).
    pub fn new(name: &[u8], inode: u32) -> Self {
        let mut field = [0u8; SFS_NAME_FIELD_LEN];
        let len = name.len().min(SFS_MAX_NAME_LEN);
        field[..len].copy_from_slice(&name[..len]);
        Self { name: field, inode }
    }

    #[inline]
    pub fn is_used(&self) -> bool {
        let inode = self.inode;
        inode != SFS_NONE && self.name[0] != 0
    }

    /// Stored name, without the terminator.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(SFS_MAX_NAME_LEN);
        &self.name[..end]
    }

    #[inline]
    pub fn inode(&self) -> u32 {
        self.inode
    }

    /// Exact comparison against an already bounded name.
    #[inline]
    pub fn matches(&self, name: &[u8]) -> bool {
        self.is_used() && self.name_bytes() == name
    }
}

/// Validates a caller-supplied name and bounds it to `SFS_MAX_NAME_LEN` bytes.
///
/// The cut never splits a UTF-8 character, so stored names stay valid `str`.
pub fn bound_name(name: &str) -> FsResult<&[u8]> {
    let bytes = name.as_bytes();
    crate::ensure!(!bytes.is_empty(), FsError::Invalid("Empty file name"));
    crate::ensure!(
        !bytes.contains(&0),
        FsError::Invalid("File name contains a NUL byte")
    );
    let mut end = bytes.len().min(SFS_MAX_NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    Ok(&bytes[..end])
}

/// Printable form of a stored name.
pub fn display_name(name: &[u8]) -> &str {
    core::str::from_utf8(name).unwrap_or("<non-utf8>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirent_layout() {
        assert_eq!(core::mem::size_of::<SfsDirEntry>(), SFS_DIRENT_SIZE);

        let entry = SfsDirEntry::new(b"notes.txt", 3);
        let bytes = entry.as_bytes();
        assert_eq!(&bytes[..9], b"notes.txt");
        assert_eq!(bytes[9..12], [0, 0, 0]);
        assert_eq!(&bytes[12..16], &3u32.to_le_bytes());
    }

    #[test]
    fn test_empty_entry() {
        let entry = SfsDirEntry::empty();
        assert!(!entry.is_used());
        assert!(entry.name_bytes().is_empty());
        assert!(!entry.matches(b""));
    }

    #[test]
    fn test_name_bounding() {
        assert_eq!(bound_name("short").unwrap(), b"short");
        assert_eq!(bound_name("exactly11ch").unwrap(), b"exactly11ch");
        assert_eq!(bound_name("much_longer_name").unwrap(), b"much_longer");
        assert_eq!(bound_name(""), Err(FsError::Invalid("Empty file name")));
        assert!(bound_name("a\0b").is_err());
    }

    #[test]
    fn test_name_bounding_keeps_utf8() {
        assert_eq!(bound_name("abcdefghijé").unwrap(), b"abcdefghij");
        assert_eq!(bound_name("日本語の名前").unwrap(), "日本語".as_bytes());
        assert_eq!(bound_name("ábcdefghijé").unwrap(), "ábcdefghij".as_bytes());

        let entry = SfsDirEntry::new(bound_name("données_été").unwrap(), 2);
        assert!(core::str::from_utf8(entry.name_bytes()).is_ok());
        assert_eq!(display_name(entry.name_bytes()), "données_é");
    }

    #[test]
    fn test_exact_match_only() {
        let entry = SfsDirEntry::new(b"abc", 0);
        assert!(entry.matches(b"abc"));
        assert!(!entry.matches(b"ab"));
        assert!(!entry.matches(b"abcd"));

        let long = SfsDirEntry::new(bound_name("much_longer_name").unwrap(), 1);
        assert!(long.matches(bound_name("much_longer_other").unwrap()));
        assert_eq!(long.name_bytes().len(), SFS_MAX_NAME_LEN);
    }
}
