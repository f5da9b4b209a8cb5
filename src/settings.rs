use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::models::WindowTab;
use crate::reconstruct::ReconstructConfig;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusteringSettings {
    pub normal_window_secs: i64,
    pub first_scan_window_secs: i64,
    pub withdraw_pair_window_secs: i64,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            normal_window_secs: 3,
            first_scan_window_secs: 600,
            withdraw_pair_window_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionSettings {
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub min_unit_price: u64,
    pub max_unit_price: u64,
    pub leading_chunks: Vec<u64>,
    pub max_snippet_chars: usize,
    pub fuzzy_threshold: f64,
    pub fuzzy_cache_capacity: usize,
    /// JSON list of known items; `None` accepts any cleaned name.
    pub catalog_path: Option<PathBuf>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            min_quantity: 1,
            max_quantity: 100_000,
            min_unit_price: 1,
            max_unit_price: 100_000_000_000,
            leading_chunks: vec![10_000_000, 100_000_000, 1_000_000_000],
            max_snippet_chars: 300,
            fuzzy_threshold: 0.88,
            fuzzy_cache_capacity: 512,
            catalog_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct OracleSettings {
    /// JSON price table; `None` disables oracle bounds.
    pub price_table_path: Option<PathBuf>,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    pub tolerance: f64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            price_table_path: None,
            cache_capacity: 256,
            cache_ttl_secs: 300,
            tolerance: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplingSettings {
    pub idle_interval_ms: u64,
    pub sampling_interval_ms: u64,
    pub burst_interval_ms: u64,
    /// Ticks spent in burst mode after the market window changes.
    pub burst_ticks: u32,
    pub queue_capacity: usize,
    /// Tab assumed for plain-text samples that do not name one.
    pub default_tab: WindowTab,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            idle_interval_ms: 2_000,
            sampling_interval_ms: 1_000,
            burst_interval_ms: 250,
            burst_ticks: 8,
            queue_capacity: 4,
            default_tab: WindowTab::Overview,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    pub clustering: ClusteringSettings,
    pub extraction: ExtractionSettings,
    pub oracle: OracleSettings,
    pub sampling: SamplingSettings,
    pub occurrence_retention_days: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            clustering: ClusteringSettings::default(),
            extraction: ExtractionSettings::default(),
            oracle: OracleSettings::default(),
            sampling: SamplingSettings::default(),
            occurrence_retention_days: 7,
        }
    }
}

impl EngineSettings {
    pub fn reconstruct_config(&self) -> ReconstructConfig {
        ReconstructConfig {
            normal_window_secs: self.clustering.normal_window_secs,
            first_scan_window_secs: self.clustering.first_scan_window_secs,
            withdraw_pair_window_secs: self.clustering.withdraw_pair_window_secs,
            min_quantity: self.extraction.min_quantity,
            max_quantity: self.extraction.max_quantity,
            min_unit_price: self.extraction.min_unit_price,
            max_unit_price: self.extraction.max_unit_price,
            leading_chunks: self.extraction.leading_chunks.clone(),
            oracle_tolerance: self.oracle.tolerance,
            max_snippet_chars: self.extraction.max_snippet_chars,
        }
    }
}

/// Engine settings read from a JSON file. A missing file is written out
/// with the defaults so there is something to edit.
pub struct SettingsStore {
    path: PathBuf,
    data: EngineSettings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            let store = Self {
                path,
                data: EngineSettings::default(),
            };
            store.persist()?;
            return Ok(store);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let data = serde_json::from_str(&contents).unwrap_or_else(|err| {
            log_warn!("Settings at {} are invalid, using defaults: {err}", path.display());
            EngineSettings::default()
        });

        Ok(Self { path, data })
    }

    pub fn get(&self) -> EngineSettings {
        self.data.clone()
    }

    fn persist(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
