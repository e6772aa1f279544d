// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::addon::AddonId;

/// What to do with a connecting client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientJoin {
    /// Let the client in without sending extra addons
    Allow,
    /// Client must receive these addons before joining
    SendAddons(Vec<AddonId>),
}

/// Remembers clients that were recently sent the extra addons.
///
/// There is no way to tell whether a client actually finished downloading,
/// so a client seen within `duration` is assumed to still have them.
#[derive(Debug, Default)]
pub struct ClientAddonCache {
    enabled: bool,
    /// `None` keeps clients cached until cleared
    duration: Option<Duration>,
    seen: HashMap<u64, DateTime<Utc>>,
}

impl ClientAddonCache {
    pub fn new(enabled: bool, duration: Option<Duration>) -> Self {
        Self {
            enabled,
            duration,
            seen: HashMap::new(),
        }
    }

    pub fn on_client_connect(
        &mut self,
        xuid: u64,
        addons: Vec<AddonId>,
        now: DateTime<Utc>,
    ) -> ClientJoin {
        if addons.is_empty() {
            return ClientJoin::Allow;
        }

        if !self.enabled {
            return ClientJoin::SendAddons(addons);
        }

        if let Some(last_seen) = self.seen.get(&xuid) {
            let fresh = self.duration.is_none_or(|duration| now - *last_seen < duration);
            if fresh {
                debug!(xuid, "Client already has the addons cached");
                return ClientJoin::Allow;
            }
        }

        self.seen.insert(xuid, now);
        ClientJoin::SendAddons(addons)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
