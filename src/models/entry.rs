//! Log entry data model.
//!
//! One `LogEntry` is produced per segmented snippet of an OCR sample. Entries
//! are immutable once extracted and are consumed by the clustering stage.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Transaction,
    Purchased,
    Placed,
    Listed,
    Withdrew,
    Other,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Transaction => "Transaction",
            EntryKind::Purchased => "Purchased",
            EntryKind::Placed => "Placed",
            EntryKind::Listed => "Listed",
            EntryKind::Withdrew => "Withdrew",
            EntryKind::Other => "Other",
        }
    }

    /// Lower value wins when a cluster picks its anchor.
    pub fn anchor_priority(&self) -> u8 {
        match self {
            EntryKind::Transaction => 0,
            EntryKind::Purchased => 1,
            EntryKind::Placed => 2,
            EntryKind::Listed => 3,
            EntryKind::Withdrew => 4,
            EntryKind::Other => 5,
        }
    }

    /// Kinds that confirm money actually changed hands.
    pub fn is_confirmed(&self) -> bool {
        match self {
            EntryKind::Transaction | EntryKind::Purchased => true,
            EntryKind::Placed | EntryKind::Listed | EntryKind::Withdrew | EntryKind::Other => {
                false
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub byte_offset: usize,
    pub raw_timestamp_text: String,
    pub kind: EntryKind,
    pub item_name: Option<String>,
    pub quantity: Option<u32>,
    pub price: Option<u64>,
    pub timestamp: Option<NaiveDateTime>,
    pub raw_text: String,
    /// Set when the snippet carried an explicit "sold" anchor.
    #[serde(default)]
    pub sold_marker: bool,
}

impl LogEntry {
    /// Per-unit price, only when the total divides evenly.
    pub fn unit_price(&self) -> Option<u64> {
        match (self.quantity, self.price) {
            (Some(quantity), Some(price)) if quantity > 0 && price % quantity as u64 == 0 => {
                Some(price / quantity as u64)
            }
            _ => None,
        }
    }

    /// Absolute distance in seconds to another entry, if both carry timestamps.
    pub fn seconds_apart(&self, other: &LogEntry) -> Option<i64> {
        match (self.timestamp, other.timestamp) {
            (Some(lhs), Some(rhs)) => Some((lhs - rhs).num_seconds().abs()),
            _ => None,
        }
    }
}
