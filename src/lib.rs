// SPDX-License-Identifier: GPL-3.0-only
pub mod addon;
pub mod api;
pub mod config;
pub mod downloader;
pub mod error;
pub mod host;
pub mod logging;
pub mod manager;
pub mod mount;

#[cfg(test)]
pub mod test_helpers;

pub use addon::{AddonId, AddonPathResolver};
pub use error::AddonError;
pub use manager::{AddonLifecycleManager, AddonManagerInterface, MultiAddonManagerApi};
