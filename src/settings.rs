use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    blocking::{CACHE_TTL, GRANT_UI_DELAY},
    focus::notify::DASHBOARD_PATH,
    interceptor::BLOCK_PAGE_PATH,
};

pub const DATA_DIR_ENV: &str = "DESKLAMP_DATA_DIR";
pub const SETTINGS_FILE: &str = "settings.json";
pub const DATABASE_FILE: &str = "desklamp.sqlite3";

/// Tunables read from `settings.json` in the data directory. Missing fields
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub cache_ttl_ms: u64,
    pub tick_interval_ms: u64,
    pub cache_refresh_interval_ms: u64,
    pub unblock_sweep_interval_ms: u64,
    pub grant_padding_ms: u64,
    pub block_page_path: String,
    pub dashboard_path: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            cache_ttl_ms: CACHE_TTL.as_millis() as u64,
            tick_interval_ms: 1_000,
            cache_refresh_interval_ms: 10_000,
            unblock_sweep_interval_ms: 30_000,
            grant_padding_ms: GRANT_UI_DELAY.as_millis() as u64,
            block_page_path: BLOCK_PAGE_PATH.to_string(),
            dashboard_path: DASHBOARD_PATH.to_string(),
        }
    }
}

impl HostSettings {
    /// Read `path`, falling back to defaults when the file is absent or
    /// malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("Ignoring malformed settings in {}: {err}", path.display());
            Self::default()
        }))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn cache_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.cache_refresh_interval_ms.max(1))
    }

    pub fn unblock_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.unblock_sweep_interval_ms.max(1))
    }

    pub fn grant_padding(&self) -> Duration {
        Duration::from_millis(self.grant_padding_ms)
    }
}

/// `$DESKLAMP_DATA_DIR`, else the platform's local data directory.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("desklamp"))
        .ok_or_else(|| anyhow!("no local data directory; set {DATA_DIR_ENV}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = HostSettings::load(&dir.path().join(SETTINGS_FILE)).unwrap();

        assert_eq!(settings, HostSettings::default());
        assert_eq!(settings.cache_ttl(), Duration::from_secs(5));
        assert_eq!(settings.grant_padding(), Duration::from_secs(4));
        assert_eq!(settings.block_page_path, "src/block/index.html");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "tick_interval_ms": 250 }"#).unwrap();

        let settings = HostSettings::load(&path).unwrap();
        assert_eq!(settings.tick_interval(), Duration::from_millis(250));
        assert_eq!(settings.cache_refresh_interval(), Duration::from_secs(10));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "not json").unwrap();

        assert_eq!(HostSettings::load(&path).unwrap(), HostSettings::default());
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let settings = HostSettings {
            tick_interval_ms: 0,
            ..HostSettings::default()
        };
        assert_eq!(settings.tick_interval(), Duration::from_millis(1));
    }
}
