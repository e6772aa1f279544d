// SPDX-License-Identifier: GPL-3.0-only
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::addon::AddonId;
use crate::downloader::DownloadRequest;
use crate::error::AddonError;
use crate::manager::{AddonLifecycleManager, ClientJoin, MapTarget};

#[derive(Debug, Error, PartialEq)]
pub enum ConsoleError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    InvalidAddon(#[from] AddonError),
}

/// Server console commands understood by the addon manager
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Print the extra addon list, or replace it when ids are given
    ExtraAddons(Option<Vec<AddonId>>),
    AddonMountDownload(Option<bool>),
    AddAddon(AddonId),
    RemoveAddon(AddonId),
    DownloadAddon(AddonId),
    RefreshAddons { reload: bool },
    ClearAddons,
    ReloadMap,
    Status,
    PrintSearchPaths,
    /// The server is changing to a map, with the addons it requires
    ChangeLevel { map: MapTarget, required: Vec<AddonId> },
    ClientConnect { xuid: u64, name: String },
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn single_id(args: &[&str], usage: &'static str) -> Result<AddonId, ConsoleError> {
    match args {
        [id] => Ok(id.parse::<AddonId>()?),
        _ => Err(ConsoleError::Usage(usage)),
    }
}

fn optional_list(arg: Option<&&str>) -> Result<Vec<AddonId>, ConsoleError> {
    Ok(match arg {
        Some(list) => AddonId::parse_list(list)?,
        None => Vec::new(),
    })
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match name {
            "mm_extra_addons" => match args.as_slice() {
                [] => Ok(Self::ExtraAddons(None)),
                [list] => Ok(Self::ExtraAddons(Some(AddonId::parse_list(list)?))),
                _ => Err(ConsoleError::Usage("mm_extra_addons [id,id,...]")),
            },
            "mm_addon_mount_download" => match args.as_slice() {
                [] => Ok(Self::AddonMountDownload(None)),
                [value] => parse_flag(value)
                    .map(|flag| Self::AddonMountDownload(Some(flag)))
                    .ok_or(ConsoleError::Usage("mm_addon_mount_download [0|1]")),
                _ => Err(ConsoleError::Usage("mm_addon_mount_download [0|1]")),
            },
            "mm_add_addon" => Ok(Self::AddAddon(single_id(&args, "mm_add_addon <id>")?)),
            "mm_remove_addon" => Ok(Self::RemoveAddon(single_id(&args, "mm_remove_addon <id>")?)),
            "mm_download_addon" => {
                Ok(Self::DownloadAddon(single_id(&args, "mm_download_addon <id>")?))
            }
            "mm_refresh_addons" => match args.as_slice() {
                [] => Ok(Self::RefreshAddons { reload: false }),
                ["reload"] => Ok(Self::RefreshAddons { reload: true }),
                [value] => parse_flag(value)
                    .map(|reload| Self::RefreshAddons { reload })
                    .ok_or(ConsoleError::Usage("mm_refresh_addons [reload]")),
                _ => Err(ConsoleError::Usage("mm_refresh_addons [reload]")),
            },
            "mm_clear_addons" => Ok(Self::ClearAddons),
            "mm_reload_map" => Ok(Self::ReloadMap),
            "mm_status" => Ok(Self::Status),
            "mm_print_searchpaths" => Ok(Self::PrintSearchPaths),
            "mm_changelevel" => match args.as_slice() {
                [map, rest @ ..] if rest.len() <= 1 => Ok(Self::ChangeLevel {
                    map: MapTarget::named(*map),
                    required: optional_list(rest.first())?,
                }),
                _ => Err(ConsoleError::Usage("mm_changelevel <map> [id,id,...]")),
            },
            "mm_workshop_map" => match args.as_slice() {
                [id, rest @ ..] if rest.len() <= 1 => {
                    let id: AddonId = id.parse()?;
                    Ok(Self::ChangeLevel {
                        map: MapTarget::workshop(id.to_string(), id),
                        required: optional_list(rest.first())?,
                    })
                }
                _ => Err(ConsoleError::Usage("mm_workshop_map <id> [id,id,...]")),
            },
            "mm_client_connect" => match args.as_slice() {
                [xuid, name @ ..] => {
                    let xuid = xuid
                        .parse()
                        .map_err(|_| ConsoleError::Usage("mm_client_connect <xuid> [name]"))?;
                    Ok(Self::ClientConnect {
                        xuid,
                        name: name.join(" "),
                    })
                }
                _ => Err(ConsoleError::Usage("mm_client_connect <xuid> [name]")),
            },
            other => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }
}

fn join_ids(ids: &[AddonId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

impl ConsoleCommand {
    /// Run the command against the manager and return the console reply
    pub fn execute(self, manager: &mut AddonLifecycleManager) -> String {
        debug!(command = ?self, "Executing console command");

        match self {
            Self::ExtraAddons(None) => {
                format!("mm_extra_addons {}", join_ids(manager.extra_addons()))
            }
            Self::ExtraAddons(Some(ids)) => {
                manager.set_extra_addons(ids);
                format!("Extra addons set to {}", join_ids(manager.extra_addons()))
            }
            Self::AddonMountDownload(None) => {
                format!("mm_addon_mount_download {}", u8::from(manager.force_download()))
            }
            Self::AddonMountDownload(Some(force)) => {
                manager.set_force_download(force);
                format!("mm_addon_mount_download set to {}", u8::from(force))
            }
            Self::AddAddon(id) => {
                if manager.add_addon(id, true) {
                    format!("Added addon {id}")
                } else {
                    format!("Addon {id} is already in the list")
                }
            }
            Self::RemoveAddon(id) => {
                if manager.remove_addon(id, true) {
                    format!("Removed addon {id}")
                } else {
                    format!("Addon {id} is not in the list")
                }
            }
            Self::DownloadAddon(id) => match manager.download_addon(id) {
                Ok(DownloadRequest::Started) => format!("Download started for addon {id}"),
                Ok(DownloadRequest::Merged) => format!("Addon {id} is already downloading"),
                Ok(DownloadRequest::AlreadyPresent) => format!("Addon {id} is already installed"),
                Err(e) => e.to_string(),
            },
            Self::RefreshAddons { reload } => {
                if manager.refresh_addons(reload) {
                    "Addons refreshed".to_string()
                } else {
                    "Addon refresh did not run, see the log".to_string()
                }
            }
            Self::ClearAddons => {
                manager.clear_addons();
                "All addons cleared".to_string()
            }
            Self::ReloadMap => {
                if manager.reload_map() {
                    "Map reload issued".to_string()
                } else {
                    "No map to reload".to_string()
                }
            }
            Self::Status => serde_json::to_string_pretty(&manager.status())
                .unwrap_or_else(|e| format!("Failed to serialize status: {e}")),
            Self::PrintSearchPaths => {
                let paths = manager.search_paths();
                if paths.is_empty() {
                    "No addon search paths mounted".to_string()
                } else {
                    paths
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Self::ChangeLevel { map, required } => {
                let name = map.name.clone();
                if manager.on_map_change(map, required) {
                    format!("Changing level to {name}")
                } else {
                    format!("Level change to {name} did not run, see the log")
                }
            }
            Self::ClientConnect { xuid, name } => match manager.on_client_connect(xuid, &name) {
                ClientJoin::Allow => format!("Client {xuid} allowed"),
                ClientJoin::SendAddons(ids) => {
                    format!("Client {xuid} must download {}", join_ids(&ids))
                }
            },
        }
    }
}
