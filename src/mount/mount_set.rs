// SPDX-License-Identifier: GPL-3.0-only
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::addon::{AddonId, AddonPathResolver};
use crate::error::AddonError;
use crate::mount::traits::SearchPath;

/// An addon the manager currently cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonRecord {
    pub id: AddonId,
    pub path: PathBuf,
    pub mounted: bool,
}

/// Mount and unmount steps that turn the mounted list into a desired one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountDiff {
    /// In mount order
    pub to_mount: Vec<AddonId>,
    /// In current mount order; unmount back to front
    pub to_unmount: Vec<AddonId>,
}

impl MountDiff {
    pub fn is_empty(&self) -> bool {
        self.to_mount.is_empty() && self.to_unmount.is_empty()
    }
}

/// Owns what is actually mounted in the content runtime.
///
/// `mounted` only ever holds addons the runtime accepted.
pub struct MountSet {
    resolver: AddonPathResolver,
    runtime: Box<dyn SearchPath>,
    records: BTreeMap<AddonId, AddonRecord>,
    mounted: Vec<AddonId>,
}

impl MountSet {
    pub fn new(resolver: AddonPathResolver, runtime: Box<dyn SearchPath>) -> Self {
        Self {
            resolver,
            runtime,
            records: BTreeMap::new(),
            mounted: Vec::new(),
        }
    }

    /// Mount an addon at the head (highest precedence) or tail of the search path
    pub fn mount(&mut self, id: AddonId, at_tail: bool) -> Result<(), AddonError> {
        if self.is_mounted(id) {
            debug!(addon = %id, "Addon is already mounted");
            return Ok(());
        }

        let path = self.resolver.resolve(id);
        if let Err(e) = self.runtime.add_search_path(&path, at_tail) {
            return Err(AddonError::MountFailure {
                id,
                path,
                reason: format!("{e:#}"),
            });
        }

        info!(addon = %id, path = %path.display(), at_tail, "Mounted addon");
        self.reference(id).mounted = true;
        self.mounted.push(id);
        Ok(())
    }

    pub fn unmount(&mut self, id: AddonId) -> Result<(), AddonError> {
        let Some(index) = self.mounted.iter().position(|mounted| *mounted == id) else {
            return Err(AddonError::NotMounted(id));
        };

        let path = self.resolver.resolve(id);
        if !self.runtime.remove_search_path(&path) {
            debug!(addon = %id, path = %path.display(), "Search path was already gone");
        }

        self.mounted.remove(index);
        if let Some(record) = self.records.get_mut(&id) {
            record.mounted = false;
        }
        info!(addon = %id, "Unmounted addon");
        Ok(())
    }

    /// Steps needed to make the mounted list equal `desired`.
    ///
    /// Mounted addons that stay desired are kept only while they form a prefix
    /// of `desired`; from the first ordering mismatch on, the tail is unmounted
    /// and remounted so precedence follows `desired`.
    pub fn diff(&self, desired: &[AddonId]) -> MountDiff {
        let kept: Vec<AddonId> = self
            .mounted
            .iter()
            .copied()
            .filter(|id| desired.contains(id))
            .collect();
        let prefix = kept
            .iter()
            .zip(desired)
            .take_while(|(kept, wanted)| kept == wanted)
            .count();

        let mut kept_seen = 0;
        let mut to_unmount = Vec::new();
        for &id in &self.mounted {
            if desired.contains(&id) {
                if kept_seen >= prefix {
                    to_unmount.push(id);
                }
                kept_seen += 1;
            } else {
                to_unmount.push(id);
            }
        }

        MountDiff {
            to_mount: desired[prefix..].to_vec(),
            to_unmount,
        }
    }

    /// Get or create the record for an addon
    pub fn reference(&mut self, id: AddonId) -> &mut AddonRecord {
        let resolver = &self.resolver;
        self.records.entry(id).or_insert_with(|| AddonRecord {
            id,
            path: resolver.resolve(id),
            mounted: false,
        })
    }

    /// Drop records that are neither mounted nor in `referenced`
    pub fn prune(&mut self, referenced: &[AddonId]) {
        self.records
            .retain(|id, record| record.mounted || referenced.contains(id));
    }

    pub fn is_mounted(&self, id: AddonId) -> bool {
        self.mounted.contains(&id)
    }

    /// Mounted addons in mount order
    pub fn mounted(&self) -> &[AddonId] {
        &self.mounted
    }

    pub fn record(&self, id: AddonId) -> Option<&AddonRecord> {
        self.records.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &AddonRecord> {
        self.records.values()
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.runtime.search_paths()
    }

    pub fn resolve(&self, id: AddonId) -> PathBuf {
        self.resolver.resolve(id)
    }
}
