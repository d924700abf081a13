//! Persisted user settings shared by the dispatcher and the page agent

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_ITEMS: usize = 100;
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 30_000;
/// Shortest accepted sync cadence
pub const MIN_SYNC_INTERVAL_MS: u64 = 1_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("maxItems must be at least 1")]
    MaxItemsTooSmall,
    #[error("syncInterval must be at least 1000 ms, got {0}")]
    SyncIntervalTooShort(u64),
}

/// Singleton settings record, stored under the `settings` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Forward new items to the remote sync collaborator
    #[serde(default)]
    pub auto_sync: bool,

    /// Capacity of the local item store
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Cadence of the periodic sync hook, in milliseconds
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u64,

    /// Let the page agent save clipboard changes without a shortcut
    #[serde(default)]
    pub auto_save_clipboard: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_sync: false,
            max_items: DEFAULT_MAX_ITEMS,
            sync_interval: DEFAULT_SYNC_INTERVAL_MS,
            auto_save_clipboard: false,
        }
    }
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

fn default_sync_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_MS
}

/// Partial settings update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_sync: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_save_clipboard: Option<bool>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_items == 0 {
            return Err(SettingsError::MaxItemsTooSmall);
        }
        if self.sync_interval < MIN_SYNC_INTERVAL_MS {
            return Err(SettingsError::SyncIntervalTooShort(self.sync_interval));
        }
        Ok(())
    }

    /// Return a copy with `patch` applied, rejecting invalid results
    pub fn patched(&self, patch: &SettingsPatch) -> Result<Settings, SettingsError> {
        let updated = Settings {
            auto_sync: patch.auto_sync.unwrap_or(self.auto_sync),
            max_items: patch.max_items.unwrap_or(self.max_items),
            sync_interval: patch.sync_interval.unwrap_or(self.sync_interval),
            auto_save_clipboard: patch.auto_save_clipboard.unwrap_or(self.auto_save_clipboard),
        };
        updated.validate()?;
        Ok(updated)
    }

    pub fn sync_period(&self) -> Duration {
        Duration::from_millis(self.sync_interval.max(MIN_SYNC_INTERVAL_MS))
    }
}
