// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use futures_util::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::addon::AddonId;
use crate::downloader::traits::DownloadProgress;

/// Byte progress of running downloads, shared between download tasks and the
/// frame loop
#[derive(Debug, Clone, Default)]
pub struct ProgressTable {
    inner: Arc<RwLock<HashMap<AddonId, DownloadProgress>>>,
}

impl ProgressTable {
    pub fn update(&self, id: AddonId, progress: DownloadProgress) {
        if let Ok(mut table) = self.inner.write() {
            table.insert(id, progress);
        }
    }

    pub fn remove(&self, id: AddonId) {
        if let Ok(mut table) = self.inner.write() {
            table.remove(&id);
        }
    }

    pub fn get(&self, id: AddonId) -> Option<DownloadProgress> {
        self.inner.read().ok()?.get(&id).copied()
    }
}

fn part_path(output_path: &Path) -> PathBuf {
    output_path.with_extension("vpk.part")
}

pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300)) // 5 minute timeout for large downloads
            .user_agent(concat!("MultiAddonManager/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_retries: 3,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Download `url` to `output_path`, retrying with exponential backoff.
    ///
    /// Content is streamed to `<output_path>.part` and renamed into place only
    /// once complete, so a partially written VPK is never visible.
    pub async fn download_with_retry(
        &self,
        id: AddonId,
        url: &str,
        output_path: &Path,
        progress: &ProgressTable,
    ) -> anyhow::Result<()> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.download_once(id, url, output_path, progress).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(addon = %id, attempt, "Download succeeded after retry");
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!(addon = %id, attempt, error = %e, "Download attempt failed");
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
                    }
                }
            }
        }

        let part_path = part_path(output_path);
        match tokio::fs::remove_file(&part_path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!(path = %part_path.display(), error = %e, "Failed to remove partial download");
            }
            _ => {}
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("Download failed after {} attempts", self.max_retries)
        }))
    }

    async fn download_once(
        &self,
        id: AddonId,
        url: &str,
        output_path: &Path,
        progress: &ProgressTable,
    ) -> anyhow::Result<()> {
        info!(addon = %id, path = %output_path.display(), "Starting download");

        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        let total = response.content_length().unwrap_or(0);
        let mut current = DownloadProgress { downloaded: 0, total };
        progress.update(id, current);

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let part_path = part_path(output_path);
        let mut file = tokio::fs::File::create(&part_path)
            .await
            .with_context(|| format!("Failed to create {}", part_path.display()))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            current.downloaded += chunk.len() as u64;
            progress.update(id, current);
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part_path, output_path)
            .await
            .with_context(|| format!("Failed to move download into {}", output_path.display()))?;

        info!(
            addon = %id,
            path = %output_path.display(),
            bytes = current.downloaded,
            "Download completed"
        );
        Ok(())
    }
}
