// SPDX-License-Identifier: GPL-3.0-only
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

use crate::addon::AddonId;
use crate::downloader::completion::{CompletionReceiver, DownloadCompletion};
use crate::downloader::queue::DownloadQueue;
use crate::downloader::traits::ContentService;
use crate::error::AddonError;

/// What `request_download` did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadRequest {
    /// Content is already installed and the request was not forced
    AlreadyPresent,
    /// A new fetch was issued
    Started,
    /// The addon was already in flight; the request was folded into it
    Merged,
}

/// Effect of a completion on the coordinator's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Downloaded { important: bool },
    /// The last outstanding important download just succeeded
    AllImportantSettled,
    Failed { important: bool },
}

/// Tracks in-flight downloads and the important ones a map transition waits on.
pub struct DownloadCoordinator {
    content: Box<dyn ContentService>,
    completions: CompletionReceiver,
    queue: DownloadQueue,
    important: BTreeSet<AddonId>,
}

impl DownloadCoordinator {
    pub fn new(content: Box<dyn ContentService>, completions: CompletionReceiver) -> Self {
        Self {
            content,
            completions,
            queue: DownloadQueue::new(),
            important: BTreeSet::new(),
        }
    }

    pub fn is_locally_present(&self, id: AddonId) -> bool {
        self.content.is_locally_present(id)
    }

    /// Request an addon download.
    ///
    /// Requests for an addon that is already in flight are merged; importance
    /// can be escalated by a later request but is never downgraded.
    pub fn request_download(
        &mut self,
        id: AddonId,
        important: bool,
        force: bool,
    ) -> Result<DownloadRequest, AddonError> {
        if !force && self.content.is_locally_present(id) {
            // Installed behind our back after an earlier failure
            if self.important.remove(&id) {
                info!(addon = %id, "Important addon became available locally");
            }
            debug!(addon = %id, "Addon already installed, skipping download");
            return Ok(DownloadRequest::AlreadyPresent);
        }

        if self.queue.contains(id) {
            if important && self.important.insert(id) {
                info!(addon = %id, "Queued addon download escalated to important");
            } else {
                debug!(addon = %id, "Addon is already queued for download");
            }
            return Ok(DownloadRequest::Merged);
        }

        // Recorded before the fetch so a failed start keeps the transition waiting
        if important {
            self.important.insert(id);
        }

        if let Err(e) = self.content.fetch(id) {
            error!(addon = %id, error = %e, "Addon download failed to start");
            return Err(AddonError::ContentUnavailable {
                id,
                reason: e.to_string(),
            });
        }

        self.queue.push(id);
        info!(addon = %id, important, "Addon download started");
        Ok(DownloadRequest::Started)
    }

    /// Record the outcome of a fetch.
    ///
    /// Failures are not retried; an important addon that failed stays pending
    /// until someone requests it again.
    pub fn on_download_completed(&mut self, id: AddonId, succeeded: bool) -> CompletionOutcome {
        if !self.queue.remove(id) {
            debug!(addon = %id, "Completion for an addon that is not queued");
        }

        if !succeeded {
            let important = self.important.contains(&id);
            if important {
                error!(addon = %id, "Important addon download failed");
            } else {
                warn!(addon = %id, "Addon download failed, dropping it");
            }
            return CompletionOutcome::Failed { important };
        }

        info!(addon = %id, "Addon downloaded successfully");

        if !self.important.remove(&id) {
            return CompletionOutcome::Downloaded { important: false };
        }

        if self.important.is_empty() {
            CompletionOutcome::AllImportantSettled
        } else {
            info!(
                addon = %id,
                remaining = self.important.len(),
                "Waiting on remaining important downloads"
            );
            CompletionOutcome::Downloaded { important: true }
        }
    }

    /// Next completion pushed by the content service, if any
    pub fn poll_completion(&mut self) -> Option<DownloadCompletion> {
        self.completions.try_recv().ok()
    }

    /// One line per queued download with known size. Does not touch state.
    pub fn report_progress(&self) -> Vec<String> {
        if self.queue.is_empty() {
            return Vec::new();
        }

        self.queue
            .iter()
            .filter_map(|id| {
                let progress = self.content.download_progress(id)?;
                (progress.total > 0).then(|| format!("Downloading addon {id}: {progress}"))
            })
            .collect()
    }

    /// Forget which downloads were important. In-flight fetches keep running.
    pub fn discard_important(&mut self) {
        if !self.important.is_empty() {
            info!(count = self.important.len(), "Discarding pending important downloads");
        }
        self.important.clear();
    }

    /// Stop waiting on important downloads that are not in `wanted`
    pub fn retain_important(&mut self, wanted: &[AddonId]) {
        self.important.retain(|id| {
            let keep = wanted.contains(id);
            if !keep {
                info!(addon = %id, "Addon is no longer wanted, not waiting on its download");
            }
            keep
        });
    }

    pub fn has_pending_important(&self) -> bool {
        !self.important.is_empty()
    }

    pub fn pending_important(&self) -> Vec<AddonId> {
        self.important.iter().copied().collect()
    }

    pub fn queue(&self) -> &DownloadQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::completion::completion_channel;
    use crate::downloader::traits::DownloadProgress;
    use crate::test_helpers::{FakeContentService, addon};

    fn setup(local: &[u64]) -> (DownloadCoordinator, FakeContentService) {
        let content = FakeContentService::with_local(local);
        let (_tx, rx) = completion_channel();
        let coordinator = DownloadCoordinator::new(Box::new(content.clone()), rx);
        (coordinator, content)
    }

    #[test]
    fn test_request_local_addon_is_noop() {
        let (mut coordinator, content) = setup(&[100]);

        let result = coordinator.request_download(addon(100), true, false);
        assert_eq!(result, Ok(DownloadRequest::AlreadyPresent));
        assert!(content.fetched().is_empty());
        assert!(coordinator.queue().is_empty());
        assert!(!coordinator.has_pending_important());
    }

    #[test]
    fn test_forced_request_fetches_local_addon() {
        let (mut coordinator, content) = setup(&[100]);

        let result = coordinator.request_download(addon(100), false, true);
        assert_eq!(result, Ok(DownloadRequest::Started));
        assert_eq!(content.fetched(), vec![addon(100)]);
    }

    #[test]
    fn test_duplicate_request_is_merged() {
        let (mut coordinator, content) = setup(&[]);

        coordinator.request_download(addon(300), true, false).unwrap();
        let second = coordinator.request_download(addon(300), true, false);

        assert_eq!(second, Ok(DownloadRequest::Merged));
        assert_eq!(content.fetched(), vec![addon(300)]);
        assert_eq!(coordinator.queue().len(), 1);
    }

    #[test]
    fn test_background_request_escalates_to_important() {
        let (mut coordinator, content) = setup(&[]);

        coordinator.request_download(addon(300), false, false).unwrap();
        assert!(!coordinator.has_pending_important());

        coordinator.request_download(addon(300), true, false).unwrap();
        assert_eq!(coordinator.pending_important(), vec![addon(300)]);
        assert_eq!(content.fetched().len(), 1);

        // A later background request never downgrades it
        coordinator.request_download(addon(300), false, false).unwrap();
        assert_eq!(coordinator.pending_important(), vec![addon(300)]);
    }

    #[test]
    fn test_failed_start_reports_content_unavailable() {
        let (mut coordinator, content) = setup(&[]);
        content.refuse_fetch(addon(500));

        let result = coordinator.request_download(addon(500), true, false);
        assert!(matches!(
            result,
            Err(AddonError::ContentUnavailable { id, .. }) if id == addon(500)
        ));
        assert!(coordinator.queue().is_empty());
        assert!(coordinator.has_pending_important());
    }

    #[test]
    fn test_out_of_order_completion_settles_after_last() {
        let (mut coordinator, _content) = setup(&[]);
        coordinator.request_download(addon(1), true, false).unwrap();
        coordinator.request_download(addon(2), true, false).unwrap();

        assert_eq!(
            coordinator.on_download_completed(addon(2), true),
            CompletionOutcome::Downloaded { important: true }
        );
        assert!(coordinator.has_pending_important());

        assert_eq!(
            coordinator.on_download_completed(addon(1), true),
            CompletionOutcome::AllImportantSettled
        );
        assert!(coordinator.queue().is_empty());
    }

    #[test]
    fn test_failed_important_download_stays_pending() {
        let (mut coordinator, content) = setup(&[]);
        coordinator.request_download(addon(1), true, false).unwrap();

        assert_eq!(
            coordinator.on_download_completed(addon(1), false),
            CompletionOutcome::Failed { important: true }
        );
        assert!(coordinator.has_pending_important());
        assert!(coordinator.queue().is_empty());

        // Retrying issues a new fetch since nothing is in flight anymore
        assert_eq!(
            coordinator.request_download(addon(1), true, false),
            Ok(DownloadRequest::Started)
        );
        assert_eq!(content.fetched(), vec![addon(1), addon(1)]);
    }

    #[test]
    fn test_retain_important_drops_unwanted_ids() {
        let (mut coordinator, _content) = setup(&[]);
        coordinator.request_download(addon(1), true, false).unwrap();
        coordinator.request_download(addon(2), true, false).unwrap();

        coordinator.retain_important(&[addon(2), addon(3)]);
        assert_eq!(coordinator.pending_important(), vec![addon(2)]);
        assert_eq!(coordinator.queue().len(), 2);

        coordinator.retain_important(&[]);
        assert!(!coordinator.has_pending_important());
    }

    #[test]
    fn test_local_request_releases_failed_important() {
        let (mut coordinator, content) = setup(&[]);
        coordinator.request_download(addon(1), true, false).unwrap();
        coordinator.on_download_completed(addon(1), false);
        content.install(addon(1));

        assert_eq!(
            coordinator.request_download(addon(1), true, false),
            Ok(DownloadRequest::AlreadyPresent)
        );
        assert!(!coordinator.has_pending_important());
    }

    #[test]
    fn test_unknown_completion_is_harmless() {
        let (mut coordinator, _content) = setup(&[]);
        assert_eq!(
            coordinator.on_download_completed(addon(42), true),
            CompletionOutcome::Downloaded { important: false }
        );
        assert_eq!(
            coordinator.on_download_completed(addon(42), false),
            CompletionOutcome::Failed { important: false }
        );
    }

    #[test]
    fn test_discard_important_keeps_queue() {
        let (mut coordinator, _content) = setup(&[]);
        coordinator.request_download(addon(1), true, false).unwrap();

        coordinator.discard_important();
        assert!(!coordinator.has_pending_important());
        assert_eq!(coordinator.queue().len(), 1);

        // The late completion is no longer tied to a transition
        assert_eq!(
            coordinator.on_download_completed(addon(1), true),
            CompletionOutcome::Downloaded { important: false }
        );
    }

    #[test]
    fn test_report_progress() {
        let (mut coordinator, content) = setup(&[]);
        assert!(coordinator.report_progress().is_empty());

        coordinator.request_download(addon(1), false, false).unwrap();
        coordinator.request_download(addon(2), false, false).unwrap();
        content.set_progress(
            addon(1),
            DownloadProgress {
                downloaded: 1024 * 1024,
                total: 4 * 1024 * 1024,
            },
        );

        let lines = coordinator.report_progress();
        assert_eq!(lines, vec!["Downloading addon 1: 1.00/4.00 MB (25.00%)".to_string()]);
        // Reporting is observational
        assert_eq!(coordinator.queue().len(), 2);
    }

    #[test]
    fn test_poll_completion_drains_channel() {
        let content = FakeContentService::with_local(&[]);
        let (tx, rx) = completion_channel();
        let mut coordinator = DownloadCoordinator::new(Box::new(content), rx);

        assert!(coordinator.poll_completion().is_none());
        tx.send(DownloadCompletion {
            id: addon(7),
            succeeded: true,
        })
        .unwrap();
        assert_eq!(
            coordinator.poll_completion(),
            Some(DownloadCompletion {
                id: addon(7),
                succeeded: true
            })
        );
        assert!(coordinator.poll_completion().is_none());
    }
}
