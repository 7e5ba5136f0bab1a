use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

/// Tunables for the reader behavior layer. Every field is optional in TOML.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Prefix of the session storage key.
    pub storage_namespace: String,
    /// Displacement in layout px at which a press counts as a drag.
    pub tap_max_move: f32,
    #[serde(rename = "tap_max_time_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tap_max_time: Duration,
    /// Offsets below this keep the header from hiding on a toggle.
    pub near_top: f32,
    #[serde(rename = "restore_delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub restore_delay: Duration,
    pub preload_ahead: usize,
    pub end_card_threshold: f32,
    /// A page must start this far below the viewport top to be the
    /// space/page-down target.
    pub next_page_margin: f32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            storage_namespace: "otaku-pos".to_string(),
            tap_max_move: 12.0,
            tap_max_time: Duration::from_millis(350),
            near_top: 64.0,
            restore_delay: Duration::from_millis(50),
            preload_ahead: 3,
            end_card_threshold: 0.35,
            next_page_margin: 16.0,
        }
    }
}

impl ReaderConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse reader config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::from_toml_str(&raw).with_context(|| format!("invalid config file {:?}", path))
    }

    /// Loads `path` when it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
