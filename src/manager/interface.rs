// SPDX-License-Identifier: GPL-3.0-only
use tracing::warn;

use crate::addon::AddonId;
use crate::manager::lifecycle::AddonLifecycleManager;

/// Contract exposed to other in-process extensions.
///
/// Addon ids are passed as text, the way they arrive from plugin code.
pub trait MultiAddonManagerApi {
    fn add_addon(&mut self, addon: &str) -> bool;
    fn remove_addon(&mut self, addon: &str) -> bool;
    fn is_addon_mounted(&self, addon: &str) -> bool;
    fn refresh_addons(&mut self) -> bool;
    fn clear_addons(&mut self) -> bool;
}

/// Borrowed view of the manager implementing [`MultiAddonManagerApi`]
pub struct AddonManagerInterface<'a> {
    manager: &'a mut AddonLifecycleManager,
}

impl<'a> AddonManagerInterface<'a> {
    pub fn new(manager: &'a mut AddonLifecycleManager) -> Self {
        Self { manager }
    }
}

fn parse_addon(addon: &str) -> Option<AddonId> {
    match addon.parse::<AddonId>() {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, "Rejected addon from extension");
            None
        }
    }
}

impl MultiAddonManagerApi for AddonManagerInterface<'_> {
    fn add_addon(&mut self, addon: &str) -> bool {
        parse_addon(addon).is_some_and(|id| self.manager.add_addon(id, true))
    }

    fn remove_addon(&mut self, addon: &str) -> bool {
        parse_addon(addon).is_some_and(|id| self.manager.remove_addon(id, true))
    }

    fn is_addon_mounted(&self, addon: &str) -> bool {
        // Probes with bad ids are common; no need to log them
        addon
            .parse::<AddonId>()
            .is_ok_and(|id| self.manager.is_addon_mounted(id))
    }

    fn refresh_addons(&mut self) -> bool {
        self.manager.refresh_addons(false)
    }

    fn clear_addons(&mut self) -> bool {
        self.manager.clear_addons()
    }
}
