// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::mount::SearchPath;

const VPK_SIGNATURE: u32 = 0x55AA_1234;
const SOURCE2_VPK_VERSION: u32 = 2;

/// Search path kept by the host itself, validating every VPK before it is added
#[derive(Debug, Default)]
pub struct LocalSearchPath {
    paths: Vec<PathBuf>,
}

impl LocalSearchPath {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reject anything that is not a Source 2 VPK directory file
fn check_vpk(path: &Path) -> anyhow::Result<()> {
    let mut file = File::open(path)
        .with_context(|| format!("VPK not found at {}", path.display()))?;

    let mut header = [0u8; 8];
    file.read_exact(&mut header)
        .context("VPK header is truncated")?;

    let signature = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    if signature != VPK_SIGNATURE {
        anyhow::bail!("Not a VPK archive (signature {signature:#010x})");
    }

    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != SOURCE2_VPK_VERSION {
        anyhow::bail!("VPK version {version} is a legacy item, not compatible with Source 2");
    }

    Ok(())
}

impl SearchPath for LocalSearchPath {
    fn add_search_path(&mut self, path: &Path, at_tail: bool) -> anyhow::Result<()> {
        if self.paths.iter().any(|p| p == path) {
            debug!(path = %path.display(), "Search path already present");
            return Ok(());
        }

        check_vpk(path)?;

        info!(path = %path.display(), at_tail, "Adding search path");
        if at_tail {
            self.paths.push(path.to_path_buf());
        } else {
            self.paths.insert(0, path.to_path_buf());
        }
        Ok(())
    }

    fn remove_search_path(&mut self, path: &Path) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        let removed = self.paths.len() != before;
        if removed {
            info!(path = %path.display(), "Removed search path");
        }
        removed
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }
}
