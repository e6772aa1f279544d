// SPDX-License-Identifier: GPL-3.0-only
use std::path::PathBuf;

use crate::addon::AddonId;

#[cfg(windows)]
const PLATFORM_BIN_DIR: &str = "bin/win64";
#[cfg(not(windows))]
const PLATFORM_BIN_DIR: &str = "bin/linuxsteamrt64";

/// Maps addon ids to the VPK the workshop client places on disk.
///
/// A dedicated server keeps its workshop content relative to the executable
/// directory, so the layout is
/// `<game_root>/<bin dir>/steamapps/workshop/content/<app_id>/<id>/<id>.vpk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonPathResolver {
    game_root: PathBuf,
    app_id: u32,
}

impl AddonPathResolver {
    pub fn new(game_root: impl Into<PathBuf>, app_id: u32) -> Self {
        Self {
            game_root: game_root.into(),
            app_id,
        }
    }

    /// Directory holding every downloaded workshop item for the app
    pub fn content_dir(&self) -> PathBuf {
        self.game_root
            .join(PLATFORM_BIN_DIR)
            .join("steamapps")
            .join("workshop")
            .join("content")
            .join(self.app_id.to_string())
    }

    /// Path of the addon's VPK. Never fails; a missing file surfaces at mount time.
    pub fn resolve(&self, id: AddonId) -> PathBuf {
        self.content_dir()
            .join(id.to_string())
            .join(format!("{id}.vpk"))
    }
}
