//! One captured OCR sample plus the UI counters read alongside it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Side;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum WindowTab {
    Overview,
    Buy,
    Sell,
    #[default]
    Unknown,
}

impl WindowTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowTab::Overview => "overview",
            WindowTab::Buy => "buy",
            WindowTab::Sell => "sell",
            WindowTab::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "overview" => Some(WindowTab::Overview),
            "buy" => Some(WindowTab::Buy),
            "sell" => Some(WindowTab::Sell),
            "unknown" => Some(WindowTab::Unknown),
            _ => None,
        }
    }

    /// Side implied by the tab alone, used as the last classification fallback.
    pub fn side_hint(&self) -> Option<Side> {
        match self {
            WindowTab::Buy => Some(Side::Buy),
            WindowTab::Sell => Some(Side::Sell),
            WindowTab::Overview | WindowTab::Unknown => None,
        }
    }

    /// Whether the tab shows a marketplace log worth sampling at all.
    pub fn is_market(&self) -> bool {
        !matches!(self, WindowTab::Unknown)
    }
}

/// Per-item UI counters: completed count and collected amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemCounter {
    pub completed_count: u64,
    pub collected_amount: u64,
}

pub type UiCounters = BTreeMap<String, ItemCounter>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub text: String,
    #[serde(default)]
    pub tab: WindowTab,
    #[serde(default)]
    pub counters: UiCounters,
    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(text: impl Into<String>, tab: WindowTab) -> Self {
        Self {
            text: text.into(),
            tab,
            counters: UiCounters::new(),
            captured_at: Utc::now(),
        }
    }

    pub fn with_counters(mut self, counters: UiCounters) -> Self {
        self.counters = counters;
        self
    }
}
