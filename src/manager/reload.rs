// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::addon::AddonId;

/// The map the server is running or about to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTarget {
    pub name: String,
    /// Set when the map itself is a workshop addon
    #[serde(default)]
    pub workshop_id: Option<AddonId>,
}

impl MapTarget {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workshop_id: None,
        }
    }

    pub fn workshop(name: impl Into<String>, id: AddonId) -> Self {
        Self {
            name: name.into(),
            workshop_id: Some(id),
        }
    }

    /// Command that loads this map again
    pub fn reload_command(&self) -> ReloadCommand {
        match self.workshop_id {
            Some(id) => ReloadCommand::WorkshopMap(id),
            None => ReloadCommand::ChangeLevel(self.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadCommand {
    WorkshopMap(AddonId),
    ChangeLevel(String),
}

impl fmt::Display for ReloadCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadCommand::WorkshopMap(id) => write!(f, "host_workshop_map {id}"),
            ReloadCommand::ChangeLevel(name) => write!(f, "changelevel {name}"),
        }
    }
}

/// Host engine hooks the manager needs
pub trait Engine {
    /// Issue a full map reload
    fn reload_map(&mut self, command: &ReloadCommand);
}
