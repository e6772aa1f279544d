// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::addon::{AddonId, AddonPathResolver};
use crate::manager::MapTarget;

const ENV_PREFIX: &str = "MAM_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Game install root the workshop content directory lives under
    pub game_root: PathBuf,

    /// Steam app id whose workshop items are mounted
    pub app_id: u32,

    /// Addons mounted on every map, in precedence order (last wins)
    pub extra_addons: Vec<AddonId>,

    /// Map the server starts on
    pub startup_map: String,

    /// Workshop id of the startup map when it is a workshop map
    pub startup_workshop_map: Option<AddonId>,

    /// Re-download desired addons on every refresh to pick up updates
    pub addon_mount_download: bool,

    /// Skip sending addons to clients that connected recently
    pub cache_clients_with_addons: bool,

    /// How long a client stays cached, 0 keeps it until the addons are cleared
    pub cache_clients_duration_secs: u64,

    /// Server frame interval in milliseconds
    pub tick_interval_ms: u64,

    /// Frames between download progress reports
    pub progress_log_interval_ticks: u32,

    /// Local API bind address (e.g., "127.0.0.1:8080")
    pub local_api_bind: SocketAddr,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit logs as JSON lines instead of human readable text
    pub log_json: bool,
}

fn parse_flag(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => anyhow::bail!("{key} must be a boolean, got {other:?}"),
    }
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("MAM_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());

        let mut config = Self::load_from(Path::new(&config_path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a TOML file, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `MAM_<FIELD>` overrides looked up through `var`
    pub fn apply_overrides<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |field: &str| var(&format!("{ENV_PREFIX}{field}"));

        if let Some(val) = get("GAME_ROOT") {
            self.game_root = PathBuf::from(val);
        }
        if let Some(val) = get("APP_ID") {
            self.app_id = val.parse().context("MAM_APP_ID")?;
        }
        if let Some(val) = get("EXTRA_ADDONS") {
            self.extra_addons = AddonId::parse_list(&val)?;
        }
        if let Some(val) = get("STARTUP_MAP") {
            self.startup_map = val;
        }
        if let Some(val) = get("STARTUP_WORKSHOP_MAP") {
            self.startup_workshop_map = match val.trim() {
                "" => None,
                id => Some(id.parse::<AddonId>()?),
            };
        }
        if let Some(val) = get("ADDON_MOUNT_DOWNLOAD") {
            self.addon_mount_download = parse_flag("MAM_ADDON_MOUNT_DOWNLOAD", &val)?;
        }
        if let Some(val) = get("CACHE_CLIENTS_WITH_ADDONS") {
            self.cache_clients_with_addons = parse_flag("MAM_CACHE_CLIENTS_WITH_ADDONS", &val)?;
        }
        if let Some(val) = get("CACHE_CLIENTS_DURATION_SECS") {
            self.cache_clients_duration_secs =
                val.parse().context("MAM_CACHE_CLIENTS_DURATION_SECS")?;
        }
        if let Some(val) = get("TICK_INTERVAL_MS") {
            self.tick_interval_ms = val.parse().context("MAM_TICK_INTERVAL_MS")?;
        }
        if let Some(val) = get("PROGRESS_LOG_INTERVAL_TICKS") {
            self.progress_log_interval_ticks =
                val.parse().context("MAM_PROGRESS_LOG_INTERVAL_TICKS")?;
        }
        if let Some(val) = get("LOCAL_API_BIND") {
            self.local_api_bind = SocketAddr::from_str(&val).context("MAM_LOCAL_API_BIND")?;
        }
        if let Some(val) = get("LOG_LEVEL") {
            self.log_level = val;
        }
        if let Some(val) = get("LOG_JSON") {
            self.log_json = parse_flag("MAM_LOG_JSON", &val)?;
        }

        Ok(())
    }

    pub fn resolver(&self) -> AddonPathResolver {
        AddonPathResolver::new(self.game_root.clone(), self.app_id)
    }

    /// The map reported to the manager at server startup
    pub fn startup_map_target(&self) -> MapTarget {
        match self.startup_workshop_map {
            Some(id) => MapTarget::workshop(self.startup_map.clone(), id),
            None => MapTarget::named(self.startup_map.clone()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game_root: PathBuf::from("/opt/cs2/game"),
            app_id: 730,
            extra_addons: Vec::new(),
            startup_map: String::from("de_dust2"),
            startup_workshop_map: None,
            addon_mount_download: false,
            cache_clients_with_addons: false,
            cache_clients_duration_secs: 0,
            tick_interval_ms: 15,
            progress_log_interval_ticks: 64,
            local_api_bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: String::from("info"),
            log_json: false,
        }
    }
}
