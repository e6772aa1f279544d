// SPDX-License-Identifier: GPL-3.0-only
pub mod id;
pub mod path;

pub use id::AddonId;
pub use path::AddonPathResolver;
