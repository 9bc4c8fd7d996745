//! Resource record persistence
//!
//! The adapter is stateless; everything that must survive between runs lives
//! in a [`ResourceRecord`] stored as JSON on disk.

use super::schema::JobConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tracked state of one job resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Remote job id, assigned once from the create response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Mirror of the job's `currentState` as of the last read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Declaration the job was launched from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<JobConfig>,
    /// Project the job was launched in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ResourceRecord {
    pub fn is_tracked(&self) -> bool {
        self.id.is_some()
    }

    /// Forget the remote job entirely
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// JSON file holding a single [`ResourceRecord`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/dfjob/state.json`, or `./dfjob-state.json` without one
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("dfjob").join("state.json"))
            .unwrap_or_else(|| PathBuf::from("dfjob-state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record; a missing file is an untracked record
    pub fn load(&self) -> Result<ResourceRecord> {
        if !self.path.exists() {
            return Ok(ResourceRecord::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {}", self.path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Corrupt state file {}", self.path.display()))
    }

    pub fn save(&self, record: &ResourceRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file {}", self.path.display()))?;

        tracing::debug!("State saved to {}", self.path.display());
        Ok(())
    }
}
