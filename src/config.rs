use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_MESSAGE_SOURCE;
use crate::zones::{default_zones, LayoutRules, ZoneSpec};

pub const DEBUG_ENV: &str = "SANTA_WIDGET_DEBUG";
pub const CONFIG_ENV: &str = "SANTA_WIDGET_CONFIG";
pub const STORE_ENV: &str = "SANTA_WIDGET_DB";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timings {
    /// Full length of the mascot animation.
    pub total_duration_ms: u64,
    pub trigger_fade_ms: u64,
    /// Pause between the trigger click and the start of the run.
    pub start_delay_ms: u64,
    pub hit_flash_ms: u64,
    pub frame_interval_ms: u64,
    pub measure_retry_delay_ms: u64,
    pub measure_retry_limit: u32,
    pub resize_debounce_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            total_duration_ms: 14_000,
            trigger_fade_ms: 500,
            start_delay_ms: 500,
            hit_flash_ms: 500,
            frame_interval_ms: 16,
            measure_retry_delay_ms: 100,
            measure_retry_limit: 5,
            resize_debounce_ms: 150,
        }
    }
}

impl Timings {
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.total_duration_ms)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Sqlite,
    Json,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Sqlite,
            path: PathBuf::from("santa-widget.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WidgetConfig {
    pub widget_id: String,
    pub message_source: String,
    pub timings: Timings,
    pub layout: LayoutRules,
    pub zones: Vec<ZoneSpec>,
    pub debug_zones: bool,
    pub storage: StorageConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            widget_id: "santa-vegas-widget".into(),
            message_source: DEFAULT_MESSAGE_SOURCE.into(),
            timings: Timings::default(),
            layout: LayoutRules::default(),
            zones: default_zones(),
            debug_zones: false,
            storage: StorageConfig::default(),
        }
    }
}

impl WidgetConfig {
    /// Read a JSON config. A missing file gives the defaults; a file that is
    /// present but not valid JSON is logged and replaced by the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read widget config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("invalid widget config {}, using defaults: {err}", path.display());
                Self::default()
            })
        } else {
            info!("no widget config at {}, using defaults", path.display());
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timings.total_duration_ms == 0 {
            bail!("timings.total_duration_ms must be greater than zero");
        }
        if self.timings.frame_interval_ms == 0 {
            bail!("timings.frame_interval_ms must be greater than zero");
        }

        let mut seen = HashSet::new();
        for zone in &self.zones {
            if !zone.window.is_valid() {
                bail!(
                    "zone {} has an empty window [{}, {})",
                    zone.id,
                    zone.window.start_ms,
                    zone.window.end_ms
                );
            }
            if !seen.insert(zone.id.as_str()) {
                bail!("duplicate zone id {}", zone.id);
            }
        }
        Ok(())
    }

    /// Apply `SANTA_WIDGET_DEBUG` and `SANTA_WIDGET_DB` from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(DEBUG_ENV) {
            if value == "1" || value.eq_ignore_ascii_case("true") {
                self.debug_zones = true;
            }
        }
        if let Ok(path) = std::env::var(STORE_ENV) {
            if !path.is_empty() {
                self.storage.path = PathBuf::from(path);
            }
        }
    }
}
