use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "shareit";
const APP_NAME: &str = "shareit";
const CONFIG_FILE: &str = "config.json";

/// Lowest code ever handed out; ports below this are privileged.
pub const MIN_UNPRIVILEGED_PORT: u16 = 1024;

/// Start of the IANA dynamic/private port range
pub const DEFAULT_PORT_RANGE_START: u16 = 49152;
pub const DEFAULT_PORT_RANGE_END: u16 = 65535;

/// Smallest configured range accepted before falling back to the default
pub const MIN_PORT_RANGE_LEN: u32 = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Interface the per-offer listeners bind to
    pub bind_host: String,
    pub port_range_start: u16,
    pub port_range_end: u16,
    /// Bound on how long `serve` waits for a client. `None` waits forever.
    pub accept_timeout_secs: Option<u64>,
    /// Where `receive` stores downloaded files
    pub download_path: PathBuf,
}

impl Default for ShareConfig {
    fn default() -> Self {
        let download_path = directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shareit");

        Self {
            bind_host: "0.0.0.0".to_string(),
            port_range_start: DEFAULT_PORT_RANGE_START,
            port_range_end: DEFAULT_PORT_RANGE_END,
            accept_timeout_secs: None,
            download_path,
        }
    }
}

impl ShareConfig {
    /// Get the config file path
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("SHAREIT_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join(CONFIG_FILE));
        }

        get_config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Load config from disk or return default
    pub fn load() -> Self {
        let path = match Self::get_config_path() {
            Some(p) => p,
            None => return Self::default(),
        };

        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save config to disk
    pub fn save(&self) {
        let path = match Self::get_config_path() {
            Some(p) => p,
            None => return,
        };

        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(&path, json) {
                    tracing::warn!("Could not save config to {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Could not serialize config: {}", e),
        }
    }

    /// Inclusive range codes are drawn from.
    ///
    /// A range that is inverted, reaches into privileged ports, or holds
    /// fewer than [`MIN_PORT_RANGE_LEN`] codes is replaced by the default one.
    pub fn port_range(&self) -> RangeInclusive<u16> {
        let (start, end) = (self.port_range_start, self.port_range_end);
        let usable = start >= MIN_UNPRIVILEGED_PORT
            && start <= end
            && u32::from(end) - u32::from(start) + 1 >= MIN_PORT_RANGE_LEN;

        if !usable {
            tracing::warn!(
                "Ignoring port range {}..={}, using {}..={}",
                start,
                end,
                DEFAULT_PORT_RANGE_START,
                DEFAULT_PORT_RANGE_END
            );
            return DEFAULT_PORT_RANGE_START..=DEFAULT_PORT_RANGE_END;
        }
        start..=end
    }

    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout_secs.map(Duration::from_secs)
    }
}

/// Get the config directory path for this app
pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}
