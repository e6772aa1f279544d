// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::addon::AddonId;
use crate::config::Config;
use crate::downloader::{CompletionOutcome, DownloadCoordinator, DownloadRequest};
use crate::error::AddonError;
use crate::manager::clients::{ClientAddonCache, ClientJoin};
use crate::manager::interface::AddonManagerInterface;
use crate::manager::reload::{Engine, MapTarget};
use crate::mount::{AddonRecord, MountSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    /// Important downloads are outstanding; mounts are applied once they settle
    AwaitingDownloads,
    ApplyingMounts,
    ReloadPending,
}

#[derive(Debug, Clone, Default)]
pub struct ManagerSettings {
    /// Re-download every desired addon on refresh, even when installed
    pub force_download: bool,
    /// Frames between download progress reports (0 reports every frame)
    pub progress_log_interval_ticks: u32,
    pub cache_clients_with_addons: bool,
    /// `None` caches clients until the addons are cleared
    pub cache_clients_duration: Option<Duration>,
}

impl From<&Config> for ManagerSettings {
    fn from(config: &Config) -> Self {
        let cache_clients_duration = match config.cache_clients_duration_secs {
            0 => None,
            secs => Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)),
        };

        Self {
            force_download: config.addon_mount_download,
            progress_log_interval_ticks: config.progress_log_interval_ticks,
            cache_clients_with_addons: config.cache_clients_with_addons,
            cache_clients_duration,
        }
    }
}

/// Point-in-time view of the manager, for introspection
#[derive(Debug, Clone, Serialize)]
pub struct AddonStatus {
    pub state: LifecycleState,
    pub content_ready: bool,
    pub force_download: bool,
    pub current_map: Option<MapTarget>,
    pub extra_addons: Vec<AddonId>,
    pub map_addons: Vec<AddonId>,
    pub mounted_addons: Vec<AddonId>,
    pub pending_important: Vec<AddonId>,
    pub queued_downloads: Vec<AddonId>,
    pub records: Vec<AddonRecord>,
}

/// Keeps the server's mounted addons in line with the extra addon list and
/// the current map.
///
/// All calls happen on the thread that owns the manager. Download completions
/// arrive through the coordinator's channel and are drained every frame.
pub struct AddonLifecycleManager {
    settings: ManagerSettings,
    state: LifecycleState,
    content_ready: bool,
    reload_on_settle: bool,
    extra_addons: Vec<AddonId>,
    map_addons: Vec<AddonId>,
    current_map: Option<MapTarget>,
    downloads: DownloadCoordinator,
    mounts: MountSet,
    engine: Box<dyn Engine>,
    clients: ClientAddonCache,
    ticks: u64,
}

impl AddonLifecycleManager {
    pub fn new(
        settings: ManagerSettings,
        downloads: DownloadCoordinator,
        mounts: MountSet,
        engine: Box<dyn Engine>,
    ) -> Self {
        let clients = ClientAddonCache::new(
            settings.cache_clients_with_addons,
            settings.cache_clients_duration,
        );

        Self {
            settings,
            state: LifecycleState::Idle,
            content_ready: false,
            reload_on_settle: false,
            extra_addons: Vec::new(),
            map_addons: Vec::new(),
            current_map: None,
            downloads,
            mounts,
            engine,
            clients,
            ticks: 0,
        }
    }

    /// The content service became usable; mount everything and reload
    pub fn on_server_activated(&mut self) -> bool {
        info!("Content service activated");
        self.content_ready = true;
        self.refresh_addons(true)
    }

    /// Server is starting up on `map`; the engine is already loading it
    pub fn on_server_startup(&mut self, map: MapTarget) -> bool {
        info!(map = %map.name, workshop_id = ?map.workshop_id, "Server starting up");
        self.current_map = Some(map);

        if !self.content_ready {
            debug!("Content service not activated yet, skipping startup refresh");
            return false;
        }
        self.refresh_addons(false)
    }

    /// Switch to a map that needs `required` mounted. Missing content is
    /// downloaded as important and the map is reloaded once it is in place.
    pub fn on_map_change(&mut self, map: MapTarget, required: Vec<AddonId>) -> bool {
        info!(map = %map.name, required = %join_ids(&required), "Map change requested");
        self.current_map = Some(map);
        self.map_addons = dedup(required);
        self.refresh_addons(true)
    }

    /// Per-frame work: deliver completions, then report progress
    pub fn on_game_frame(&mut self) {
        while let Some(completion) = self.downloads.poll_completion() {
            self.on_download_completed(completion.id, completion.succeeded);
        }

        self.ticks = self.ticks.wrapping_add(1);
        let interval = u64::from(self.settings.progress_log_interval_ticks.max(1));
        if self.ticks % interval != 0 {
            return;
        }

        for line in self.downloads.report_progress() {
            info!("{line}");
        }
    }

    pub fn on_client_connect(&mut self, xuid: u64, name: &str) -> ClientJoin {
        self.on_client_connect_at(xuid, name, Utc::now())
    }

    pub fn on_client_connect_at(
        &mut self,
        xuid: u64,
        name: &str,
        now: DateTime<Utc>,
    ) -> ClientJoin {
        let addons: Vec<AddonId> = self
            .extra_addons
            .iter()
            .copied()
            .filter(|id| self.mounts.is_mounted(*id))
            .collect();

        let decision = self.clients.on_client_connect(xuid, addons, now);
        match &decision {
            ClientJoin::Allow => info!(client = %name, xuid, "Client connected, no addons to send"),
            ClientJoin::SendAddons(addons) => {
                info!(client = %name, xuid, addons = %join_ids(addons), "Sending addons to client")
            }
        }
        decision
    }

    pub fn on_download_completed(&mut self, id: AddonId, succeeded: bool) {
        match self.downloads.on_download_completed(id, succeeded) {
            CompletionOutcome::AllImportantSettled => {
                if self.state == LifecycleState::AwaitingDownloads {
                    info!("All important downloads finished");
                    self.settle();
                }
            }
            CompletionOutcome::Downloaded { important: false } => {
                // Background content that is still wanted can be mounted right away
                let wanted = self.desired_addons().contains(&id);
                if wanted && self.content_ready && self.state == LifecycleState::Idle {
                    self.settle();
                }
            }
            CompletionOutcome::Downloaded { important: true } => {}
            CompletionOutcome::Failed { important: true } => {
                warn!(
                    addon = %id,
                    "Map reload is blocked on a failed download, request the addon again to retry"
                );
            }
            CompletionOutcome::Failed { important: false } => {}
        }
    }

    /// Add an addon to the extra list. Returns false if it was already listed.
    pub fn add_addon(&mut self, id: AddonId, refresh: bool) -> bool {
        if self.extra_addons.contains(&id) {
            warn!(addon = %id, "Addon is already in the list");
            return false;
        }

        info!(addon = %id, "Adding addon to list");
        self.extra_addons.push(id);
        self.mounts.reference(id);

        if refresh {
            self.refresh_addons(false);
        }
        true
    }

    /// Remove an addon from the extra list. Returns false if it was not listed.
    pub fn remove_addon(&mut self, id: AddonId, refresh: bool) -> bool {
        let Some(index) = self.extra_addons.iter().position(|listed| *listed == id) else {
            warn!(addon = %id, "Addon is not in the list");
            return false;
        };

        info!(addon = %id, "Removing addon from list");
        self.extra_addons.remove(index);

        if refresh {
            self.refresh_addons(false);
        }
        true
    }

    /// Replace the extra list wholesale, keeping first occurrences in order
    pub fn set_extra_addons(&mut self, ids: Vec<AddonId>) -> bool {
        self.extra_addons = dedup(ids);
        info!(addons = %join_ids(&self.extra_addons), "Extra addon list replaced");
        self.refresh_addons(false)
    }

    /// Force a background download of an addon, e.g. to pick up an update
    pub fn download_addon(&mut self, id: AddonId) -> Result<DownloadRequest, AddonError> {
        self.downloads.request_download(id, false, true)
    }

    /// Bring the mounted addons in line with the extra list and current map.
    ///
    /// With `reload`, missing content is downloaded as important and the map
    /// is reloaded once everything is mounted.
    pub fn refresh_addons(&mut self, reload: bool) -> bool {
        if !self.content_ready {
            warn!("Content service is not activated yet, cannot refresh addons");
            return false;
        }

        let desired = self.desired_addons();
        info!(addons = %join_ids(&desired), reload, "Refreshing addons");

        // Waits on addons that are no longer wanted must not block this target
        self.downloads.retain_important(&desired);

        let force = self.settings.force_download;
        for &id in &desired {
            self.mounts.reference(id);
            if let Err(e) = self.downloads.request_download(id, reload, force) {
                warn!(addon = %id, error = %e, "Could not request addon download");
            }
        }

        self.reload_on_settle |= reload;

        if self.downloads.has_pending_important() {
            self.transition(LifecycleState::AwaitingDownloads);
            info!(
                pending = %join_ids(&self.downloads.pending_important()),
                "Waiting on important downloads before mounting"
            );
            return true;
        }

        self.settle()
    }

    /// Unmount everything and forget both lists. Pending downloads keep
    /// running but their completions no longer affect anything.
    pub fn clear_addons(&mut self) -> bool {
        info!("Clearing all addons");

        for id in self.mounts.mounted().to_vec().into_iter().rev() {
            if let Err(e) = self.mounts.unmount(id) {
                debug!(error = %e, "Skipping unmount");
            }
        }

        self.extra_addons.clear();
        self.map_addons.clear();
        self.downloads.discard_important();
        self.reload_on_settle = false;
        self.clients.clear();
        self.mounts.prune(&[]);
        self.transition(LifecycleState::Idle);
        true
    }

    /// Issue a reload of the current map. Returns false if no map is known.
    pub fn reload_map(&mut self) -> bool {
        let Some(map) = &self.current_map else {
            warn!("No current map known, skipping map reload");
            return false;
        };

        let command = map.reload_command();
        info!(command = %command, "Reloading map");
        self.engine.reload_map(&command);
        true
    }

    pub fn set_current_map(&mut self, map: MapTarget) {
        self.current_map = Some(map);
    }

    pub fn clear_current_workshop_map(&mut self) {
        if let Some(map) = &mut self.current_map {
            map.workshop_id = None;
        }
    }

    pub fn set_force_download(&mut self, force: bool) {
        self.settings.force_download = force;
    }

    pub fn force_download(&self) -> bool {
        self.settings.force_download
    }

    pub fn is_addon_mounted(&self, id: AddonId) -> bool {
        self.mounts.is_mounted(id)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn extra_addons(&self) -> &[AddonId] {
        &self.extra_addons
    }

    pub fn map_addons(&self) -> &[AddonId] {
        &self.map_addons
    }

    pub fn mounted_addons(&self) -> &[AddonId] {
        self.mounts.mounted()
    }

    pub fn current_map(&self) -> Option<&MapTarget> {
        self.current_map.as_ref()
    }

    pub fn record(&self, id: AddonId) -> Option<&AddonRecord> {
        self.mounts.record(id)
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.mounts.search_paths()
    }

    pub fn status(&self) -> AddonStatus {
        AddonStatus {
            state: self.state,
            content_ready: self.content_ready,
            force_download: self.settings.force_download,
            current_map: self.current_map.clone(),
            extra_addons: self.extra_addons.clone(),
            map_addons: self.map_addons.clone(),
            mounted_addons: self.mounts.mounted().to_vec(),
            pending_important: self.downloads.pending_important(),
            queued_downloads: self.downloads.queue().iter().collect(),
            records: self.mounts.records().cloned().collect(),
        }
    }

    /// Interface handed to other in-process extensions
    pub fn interface(&mut self) -> AddonManagerInterface<'_> {
        AddonManagerInterface::new(self)
    }

    /// Extra addons first, then the map's, without duplicates
    fn desired_addons(&self) -> Vec<AddonId> {
        dedup(
            self.extra_addons
                .iter()
                .chain(&self.map_addons)
                .copied()
                .collect(),
        )
    }

    /// Apply mounts and, if a reload was requested, reload the map
    fn settle(&mut self) -> bool {
        self.transition(LifecycleState::ApplyingMounts);
        let reload = std::mem::take(&mut self.reload_on_settle);

        let applied = self.apply_mounts(reload);
        if applied && reload {
            self.transition(LifecycleState::ReloadPending);
            self.reload_map();
        }

        self.transition(LifecycleState::Idle);
        let desired = self.desired_addons();
        self.mounts.prune(&desired);
        applied
    }

    /// Commit the mount diff for every desired addon that is present locally.
    ///
    /// During a map transition a mount failure aborts the transition and
    /// restores the previous mounts.
    fn apply_mounts(&mut self, transition: bool) -> bool {
        let desired: Vec<AddonId> = self
            .desired_addons()
            .into_iter()
            .filter(|id| self.downloads.is_locally_present(*id))
            .collect();

        let previous = self.mounts.mounted().to_vec();
        let diff = self.mounts.diff(&desired);
        if diff.is_empty() {
            debug!("Mounted addons already up to date");
            return true;
        }

        for &id in diff.to_unmount.iter().rev() {
            if let Err(e) = self.mounts.unmount(id) {
                debug!(error = %e, "Skipping unmount");
            }
        }

        let mut all_mounted = true;
        for &id in &diff.to_mount {
            let Err(e) = self.mounts.mount(id, false) else {
                continue;
            };

            if transition {
                error!(error = %e, "Addon failed to mount, aborting map reload");
                self.restore_mounts(&previous);
                return false;
            }
            warn!(error = %e, "Addon failed to mount");
            all_mounted = false;
        }

        all_mounted
    }

    fn restore_mounts(&mut self, previous: &[AddonId]) {
        let diff = self.mounts.diff(previous);

        for &id in diff.to_unmount.iter().rev() {
            if let Err(e) = self.mounts.unmount(id) {
                debug!(error = %e, "Skipping unmount");
            }
        }
        for &id in &diff.to_mount {
            if let Err(e) = self.mounts.mount(id, false) {
                error!(error = %e, "Failed to restore previously mounted addon");
            }
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Addon lifecycle state change");
            self.state = next;
        }
    }
}

fn dedup(ids: Vec<AddonId>) -> Vec<AddonId> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

fn join_ids(ids: &[AddonId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
