// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
#[macro_use]
extern crate alloc;

// Core Modules
pub mod core;
pub mod fs;

// Reusable types and traits
pub use crate::core::traits::*;

/// Simple inode file system.
///
/// See [`fs::volume::Sfs`] for the mounted volume, [`fs::formatter::SfsFormatter`]
/// and [`fs::checker::SfsChecker`] for offline tooling.
pub mod prelude {
    pub use crate::core::errors::*;
    pub use crate::core::traits::*;
    pub use crate::fs::prelude::*;
    pub use sfsio::prelude::*;
}
