// SPDX-License-Identifier: MIT
pub mod allocator;
pub mod checker;
pub mod constant;
pub mod descriptor;
pub mod directory;
pub mod engine;
pub mod formatter;
pub mod inode_table;
pub mod meta;
pub mod types;
pub mod volume;

// Public Interface
pub mod traits {
    pub use super::allocator::SfsBlockAllocator;
    pub use super::checker::{SfsCheckReport, SfsChecker, SfsIssue};
    pub use super::descriptor::{SfsDescriptor, SfsDescriptorTable};
    pub use super::directory::SfsDirectory;
    pub use super::formatter::SfsFormatter;
    pub use super::inode_table::{SfsChain, SfsInodeTable};
    pub use super::meta::SfsMeta;
    pub use super::volume::{Sfs, SfsStat};
}

pub mod prelude {
    pub use super::constant::*;
    pub use super::traits::*;
    pub use super::types::*;
}
