// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::fmt;

use crate::addon::AddonId;

/// Bytes received so far for one in-flight download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: u64,
}

impl DownloadProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.downloaded as f64 / self.total as f64 * 100.0
    }
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MIB: f64 = 1024.0 * 1024.0;
        write!(
            f,
            "{:.2}/{:.2} MB ({:.2}%)",
            self.downloaded as f64 / MIB,
            self.total as f64 / MIB,
            self.percent()
        )
    }
}

/// External content service the coordinator drives.
///
/// `fetch` only starts the download; its outcome arrives later as a
/// [`DownloadCompletion`](crate::downloader::DownloadCompletion) on the
/// completion channel, delivered on the same thread that owns the manager.
pub trait ContentService {
    /// Begin fetching an addon. Errors mean the download never started.
    fn fetch(&mut self, id: AddonId) -> anyhow::Result<()>;

    /// Whether the addon's content is already installed locally
    fn is_locally_present(&self, id: AddonId) -> bool;

    /// Current byte counts for an in-flight download, if known
    fn download_progress(&self, id: AddonId) -> Option<DownloadProgress>;
}

/// Resolves where a workshop item's content can be downloaded from
#[async_trait]
pub trait WorkshopSource: Send + Sync {
    async fn resolve_download_url(&self, id: AddonId) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_display() {
        let progress = DownloadProgress {
            downloaded: 512 * 1024,
            total: 2 * 1024 * 1024,
        };
        assert_eq!(progress.to_string(), "0.50/2.00 MB (25.00%)");
    }

    #[test]
    fn test_progress_unknown_total() {
        let progress = DownloadProgress {
            downloaded: 100,
            total: 0,
        };
        assert_eq!(progress.percent(), 0.0);
    }
}
