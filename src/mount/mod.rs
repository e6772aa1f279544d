// SPDX-License-Identifier: GPL-3.0-only
pub mod mount_set;
pub mod traits;

pub use mount_set::{AddonRecord, MountDiff, MountSet};
pub use traits::SearchPath;
