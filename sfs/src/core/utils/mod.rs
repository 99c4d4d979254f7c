// SPDX-License-Identifier: MIT
pub mod bitmap;
