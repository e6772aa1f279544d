// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};

use crate::addon::{AddonId, AddonPathResolver};
use crate::downloader::client::{HttpClient, ProgressTable};
use crate::downloader::completion::{CompletionSender, DownloadCompletion};
use crate::downloader::traits::{ContentService, DownloadProgress, WorkshopSource};

/// Content service backed by the Steam Workshop.
///
/// Each fetch runs as its own task on the ambient tokio runtime and reports
/// back through the completion channel.
pub struct WorkshopContentService {
    resolver: AddonPathResolver,
    source: Arc<dyn WorkshopSource>,
    client: Arc<HttpClient>,
    progress: ProgressTable,
    completions: CompletionSender,
}

impl WorkshopContentService {
    pub fn new(
        resolver: AddonPathResolver,
        source: Arc<dyn WorkshopSource>,
        client: HttpClient,
        completions: CompletionSender,
    ) -> Self {
        Self {
            resolver,
            source,
            client: Arc::new(client),
            progress: ProgressTable::default(),
            completions,
        }
    }
}

async fn download_item(
    source: &dyn WorkshopSource,
    client: &HttpClient,
    id: AddonId,
    path: PathBuf,
    progress: &ProgressTable,
) -> anyhow::Result<()> {
    let url = source.resolve_download_url(id).await?;
    client.download_with_retry(id, &url, &path, progress).await
}

impl ContentService for WorkshopContentService {
    fn fetch(&mut self, id: AddonId) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("No async runtime available to run the download")?;

        let source = Arc::clone(&self.source);
        let client = Arc::clone(&self.client);
        let progress = self.progress.clone();
        let completions = self.completions.clone();
        let path = self.resolver.resolve(id);

        runtime.spawn(async move {
            let result = download_item(source.as_ref(), &client, id, path, &progress).await;
            progress.remove(id);

            let succeeded = match result {
                Ok(()) => true,
                Err(e) => {
                    error!(addon = %id, error = %e, "Workshop download failed");
                    false
                }
            };

            if completions.send(DownloadCompletion { id, succeeded }).is_err() {
                warn!(addon = %id, "Download finished after the manager shut down");
            }
        });

        Ok(())
    }

    fn is_locally_present(&self, id: AddonId) -> bool {
        self.resolver.resolve(id).is_file()
    }

    fn download_progress(&self, id: AddonId) -> Option<DownloadProgress> {
        self.progress.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::completion::completion_channel;
    use crate::test_helpers::{addon, create_temp_dir};
    use async_trait::async_trait;

    struct MockSource {
        base_url: String,
    }

    #[async_trait]
    impl WorkshopSource for MockSource {
        async fn resolve_download_url(&self, id: AddonId) -> anyhow::Result<String> {
            if id.get() == 404 {
                anyhow::bail!("Workshop item not found: {id}");
            }
            Ok(format!("{}/ugc/{}", self.base_url, id))
        }
    }

    #[tokio::test]
    async fn test_fetch_installs_addon_and_reports_completion() {
        let mut server = mockito::Server::new_async().await;
        let temp_dir = create_temp_dir();
        let resolver = AddonPathResolver::new(temp_dir.path(), 730);
        let (tx, mut rx) = completion_channel();

        let mock = server
            .mock("GET", "/ugc/3070284539")
            .with_status(200)
            .with_body("addon data")
            .create_async()
            .await;

        let source = Arc::new(MockSource { base_url: server.url() });
        let mut service =
            WorkshopContentService::new(resolver.clone(), source, HttpClient::new().unwrap(), tx);

        assert!(!service.is_locally_present(addon(3070284539)));
        service.fetch(addon(3070284539)).unwrap();

        let completion = rx.recv().await.unwrap();
        assert_eq!(
            completion,
            DownloadCompletion {
                id: addon(3070284539),
                succeeded: true
            }
        );
        assert!(service.is_locally_present(addon(3070284539)));
        assert!(service.download_progress(addon(3070284539)).is_none());
        assert_eq!(
            std::fs::read_to_string(resolver.resolve(addon(3070284539))).unwrap(),
            "addon data"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_failed_completion() {
        let temp_dir = create_temp_dir();
        let resolver = AddonPathResolver::new(temp_dir.path(), 730);
        let (tx, mut rx) = completion_channel();
        let source = Arc::new(MockSource {
            base_url: "http://127.0.0.1:9".to_string(),
        });
        let mut service =
            WorkshopContentService::new(resolver, source, HttpClient::new().unwrap(), tx);

        service.fetch(addon(404)).unwrap();
        let completion = rx.recv().await.unwrap();
        assert!(!completion.succeeded);
        assert!(!service.is_locally_present(addon(404)));
    }

    #[test]
    fn test_fetch_without_runtime_fails_to_start() {
        let temp_dir = create_temp_dir();
        let resolver = AddonPathResolver::new(temp_dir.path(), 730);
        let (tx, _rx) = completion_channel();
        let source = Arc::new(MockSource {
            base_url: "http://127.0.0.1:9".to_string(),
        });
        let mut service =
            WorkshopContentService::new(resolver, source, HttpClient::new().unwrap(), tx);

        assert!(service.fetch(addon(1)).is_err());
    }
}
