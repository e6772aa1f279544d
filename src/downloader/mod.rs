// SPDX-License-Identifier: GPL-3.0-only
pub mod client;
pub mod completion;
pub mod coordinator;
pub mod queue;
pub mod steam;
pub mod traits;
pub mod workshop;

pub use client::{HttpClient, ProgressTable};
pub use completion::{CompletionReceiver, CompletionSender, DownloadCompletion, completion_channel};
pub use coordinator::{CompletionOutcome, DownloadCoordinator, DownloadRequest};
pub use queue::DownloadQueue;
pub use steam::{SteamConnection, SteamError};
pub use traits::{ContentService, DownloadProgress, WorkshopSource};
pub use workshop::WorkshopContentService;
