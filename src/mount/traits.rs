// SPDX-License-Identifier: GPL-3.0-only
use std::path::{Path, PathBuf};

/// The content runtime's ordered search path.
///
/// Entries added at the head take precedence over everything mounted before them.
pub trait SearchPath {
    /// Register a VPK. Errors mean the runtime rejected the content.
    fn add_search_path(&mut self, path: &Path, at_tail: bool) -> anyhow::Result<()>;

    /// Returns false if the path was not registered
    fn remove_search_path(&mut self, path: &Path) -> bool;

    /// Current search order, highest precedence first
    fn search_paths(&self) -> Vec<PathBuf>;
}
