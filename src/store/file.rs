use std::{collections::BTreeMap, fs, path::PathBuf, sync::RwLock};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use super::ClaimBackend;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ClaimFile {
    #[serde(default)]
    claims: BTreeMap<String, DateTime<Utc>>,
}

/// Claims kept in a small JSON document, one entry per widget id.
pub struct JsonFileClaimBackend {
    path: PathBuf,
    data: RwLock<ClaimFile>,
}

impl JsonFileClaimBackend {
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read claims from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("claims file {} is corrupt, starting empty: {err}", path.display());
                ClaimFile::default()
            })
        } else {
            ClaimFile::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn persist(&self, data: &ClaimFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write claims to {}", self.path.display()))
    }
}

impl ClaimBackend for JsonFileClaimBackend {
    fn load(&self, widget_id: &str) -> Result<Option<DateTime<Utc>>> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("claims lock poisoned"))?;
        Ok(guard.claims.get(widget_id).copied())
    }

    fn save(&self, widget_id: &str, claimed_at: DateTime<Utc>) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("claims lock poisoned"))?;
        if guard.claims.contains_key(widget_id) {
            return Ok(());
        }
        guard.claims.insert(widget_id.to_string(), claimed_at);
        if let Err(err) = self.persist(&guard) {
            guard.claims.remove(widget_id);
            return Err(err);
        }
        Ok(())
    }
}
