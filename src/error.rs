// SPDX-License-Identifier: GPL-3.0-only
use std::path::PathBuf;

use crate::addon::AddonId;

/// Failures of the addon lifecycle.
///
/// `NotMounted` and duplicate adds never escalate past the manager; they are
/// reported to callers as a plain `false`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddonError {
    #[error("Content for addon {id} is unavailable: {reason}")]
    ContentUnavailable { id: AddonId, reason: String },

    #[error("Failed to mount addon {id} from {}: {reason}", path.display())]
    MountFailure {
        id: AddonId,
        path: PathBuf,
        reason: String,
    },

    #[error("Addon {0} is not mounted")]
    NotMounted(AddonId),

    #[error("Invalid addon id: {0:?}")]
    InvalidAddonId(String),
}
