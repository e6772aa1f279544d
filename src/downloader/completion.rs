// SPDX-License-Identifier: GPL-3.0-only
use tokio::sync::mpsc;

use crate::addon::AddonId;

/// Outcome of a fetch, pushed by the content service when it settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadCompletion {
    pub id: AddonId,
    pub succeeded: bool,
}

pub type CompletionSender = mpsc::UnboundedSender<DownloadCompletion>;
pub type CompletionReceiver = mpsc::UnboundedReceiver<DownloadCompletion>;

/// Channel that carries completions back to the coordinator.
///
/// The coordinator drains it once per frame, so completions are processed on
/// the owning thread regardless of where the download ran.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    mpsc::unbounded_channel()
}
