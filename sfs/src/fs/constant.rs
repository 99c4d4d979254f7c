// SPDX-License-Identifier: MIT

// === Superblock ===

// Magic number ("SFS" + layout revision 1), stored in s_magic
pub const SFS_MAGIC: u32 = 0x5346_5301;

// Block holding the superblock header and the root directory
pub const SFS_SUPERBLOCK_BLOCK: u32 = 0;

// Packed header size, root entries follow immediately
pub const SFS_SUPERBLOCK_HEADER_SIZE: usize = 16;

// === Default geometry ===

pub const SFS_DEFAULT_BLOCK_SIZE: u32 = 1024;
pub const SFS_DEFAULT_BLOCK_COUNT: u32 = 1026;
pub const SFS_DEFAULT_INODE_COUNT: u32 = 63;
pub const SFS_DEFAULT_DIRECT_COUNT: u32 = 14;
pub const SFS_DEFAULT_MAX_OPEN: usize = 32;

pub const SFS_MIN_BLOCK_SIZE: u32 = 64;

// === Directory ===

/// Longest stored file name, in bytes.
pub const SFS_MAX_NAME_LEN: usize = 11;

// Name field, always NUL-terminated
pub const SFS_NAME_FIELD_LEN: usize = SFS_MAX_NAME_LEN + 1;

pub const SFS_DIRENT_SIZE: usize = 16;

// === Inode ===

// size + link
pub const SFS_INODE_HEADER_SIZE: usize = 8;

pub const SFS_POINTER_SIZE: usize = 4;

/// `size` value marking an unused inode slot.
pub const SFS_INODE_FREE: u32 = u32::MAX;

/// Unset block pointer, absent link or empty root entry.
pub const SFS_NONE: u32 = u32::MAX;
