use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::TIMESTAMP_FORMAT;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Buy" => Some(Side::Buy),
            "Sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Case {
    Collect,
    RelistFull,
    RelistPartial,
}

impl Case {
    pub fn as_str(&self) -> &'static str {
        match self {
            Case::Collect => "Collect",
            Case::RelistFull => "RelistFull",
            Case::RelistPartial => "RelistPartial",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Collect" => Some(Case::Collect),
            "RelistFull" => Some(Case::RelistFull),
            "RelistPartial" => Some(Case::RelistPartial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    ParsedFromLog,
    UiInferred,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::ParsedFromLog => "ParsedFromLog",
            Provenance::UiInferred => "UiInferred",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ParsedFromLog" => Some(Provenance::ParsedFromLog),
            "UiInferred" => Some(Provenance::UiInferred),
            _ => None,
        }
    }
}

/// The reconstructed output unit handed to the durable store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub item_name: String,
    pub quantity: u32,
    pub price: u64,
    pub timestamp: NaiveDateTime,
    pub side: Side,
    pub case: Case,
    pub occurrence_index: u32,
    pub provenance: Provenance,
}

impl Transaction {
    pub fn key(&self) -> TradeKey {
        TradeKey {
            item_name: self.item_name.clone(),
            quantity: self.quantity,
            price: self.price,
            side: self.side,
            timestamp: self.timestamp,
        }
    }
}

/// Identity of a trade up to its occurrence index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TradeKey {
    pub item_name: String,
    pub quantity: u32,
    pub price: u64,
    pub side: Side,
    pub timestamp: NaiveDateTime,
}

impl TradeKey {
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl std::fmt::Display for TradeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} x{} @ {} ({})",
            self.side.as_str(),
            self.item_name,
            self.quantity,
            self.price,
            self.timestamp_text()
        )
    }
}
