use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{
    Case, EntryKind, LogEntry, Provenance, Side, TradeKey, Transaction, UiCounters, WindowTab,
};
use crate::parsing::confusables::letter_key;

use super::classify::ClusterVerdict;
use super::cluster::Cluster;
use super::config::ReconstructConfig;

/// Raw text of the entry a candidate was reconstructed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorText {
    pub timestamp_text: String,
    pub snippet: String,
}

/// A fully-resolved trade that has not yet passed the novelty gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub item_name: String,
    pub quantity: u32,
    pub price: u64,
    pub timestamp: NaiveDateTime,
    pub side: Side,
    pub case: Case,
    pub provenance: Provenance,
    /// `None` for candidates synthesized from UI counters.
    pub anchor: Option<AnchorText>,
    pub member_texts: Vec<String>,
}

impl Candidate {
    pub fn key(&self) -> TradeKey {
        TradeKey {
            item_name: self.item_name.clone(),
            quantity: self.quantity,
            price: self.price,
            side: self.side,
            timestamp: self.timestamp,
        }
    }

    pub fn into_transaction(self, occurrence_index: u32) -> Transaction {
        Transaction {
            item_name: self.item_name,
            quantity: self.quantity,
            price: self.price,
            timestamp: self.timestamp,
            side: self.side,
            case: self.case,
            occurrence_index,
            provenance: self.provenance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscardReason {
    NoItem,
    NoTimestamp,
    NoPrice,
    NoQuantity,
    QuantityOutOfBounds,
    ZeroPrice,
    ImplausibleUnitPrice,
    UnitPriceMismatch,
    NotATrade,
    UndeterminedSide,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::NoItem => "no item",
            DiscardReason::NoTimestamp => "no timestamp",
            DiscardReason::NoPrice => "no recoverable price",
            DiscardReason::NoQuantity => "no recoverable quantity",
            DiscardReason::QuantityOutOfBounds => "quantity out of bounds",
            DiscardReason::ZeroPrice => "zero price",
            DiscardReason::ImplausibleUnitPrice => "implausible unit price",
            DiscardReason::UnitPriceMismatch => "placed/withdrawn unit prices differ",
            DiscardReason::NotATrade => "not a completed trade",
            DiscardReason::UndeterminedSide => "side undetermined",
        }
    }

    /// Implausible values are reported at info level; unrecoverable parses at debug.
    pub fn is_implausible(&self) -> bool {
        matches!(
            self,
            DiscardReason::QuantityOutOfBounds
                | DiscardReason::ZeroPrice
                | DiscardReason::ImplausibleUnitPrice
                | DiscardReason::UnitPriceMismatch
        )
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positive movement of an item's UI counters between two samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDelta {
    pub item_name: String,
    pub completed: u64,
    pub collected: u64,
}

/// Deltas keyed by the item's letter key.
pub type CounterDeltas = BTreeMap<String, CounterDelta>;

/// Items whose completed count and collected amount both grew. Items absent
/// from the previous counters have no reference point and yield nothing.
pub fn counter_deltas(current: &UiCounters, previous: Option<&UiCounters>) -> CounterDeltas {
    let Some(previous) = previous else {
        return CounterDeltas::new();
    };

    current
        .iter()
        .filter_map(|(name, now)| {
            let before = previous.get(name)?;
            (now.completed_count > before.completed_count
                && now.collected_amount > before.collected_amount)
                .then(|| {
                    (
                        letter_key(name),
                        CounterDelta {
                            item_name: name.clone(),
                            completed: now.completed_count - before.completed_count,
                            collected: now.collected_amount - before.collected_amount,
                        },
                    )
                })
        })
        .collect()
}

/// Fill in quantity and price for a classified cluster.
///
/// Cascade: the anchor's own values, then confirmed siblings, then a
/// buy-side placed-minus-withdrawn pair with matching unit prices, then the
/// item's UI counter delta when the sample's tab agrees with the side.
pub fn reconcile(
    cluster: &Cluster,
    verdict: ClusterVerdict,
    tab: WindowTab,
    deltas: &CounterDeltas,
    config: &ReconstructConfig,
) -> Result<Candidate, DiscardReason> {
    let item = cluster.item_name().ok_or(DiscardReason::NoItem)?;
    let (side, case, pending) = match verdict {
        ClusterVerdict::Trade { side, case } => (side, case, false),
        ClusterVerdict::PendingAdjustment => (Side::Buy, Case::RelistPartial, true),
        ClusterVerdict::NotATrade => return Err(DiscardReason::NotATrade),
        ClusterVerdict::Undetermined => return Err(DiscardReason::UndeterminedSide),
    };

    let anchor = cluster.anchor();
    let timestamp = anchor
        .timestamp
        .or_else(|| cluster.latest_timestamp())
        .ok_or(DiscardReason::NoTimestamp)?;

    let mut quantity = None;
    let mut price = None;
    let mut provenance = Provenance::ParsedFromLog;

    if !pending {
        quantity = anchor.quantity;
        price = anchor.price;

        for sibling in cluster.entries.iter().filter(|e| e.kind.is_confirmed()) {
            quantity = quantity.or(sibling.quantity);
            price = price.or(sibling.price);
        }

        if let (Some(total), None) = (price, quantity) {
            quantity = order_unit_price(cluster).and_then(|unit| exact_quotient(total, unit));
        }
    }

    let mut pair_failure = None;
    if side == Side::Buy && (quantity.is_none() || price.is_none()) {
        match placed_minus_withdrawn(cluster) {
            Ok((q, p)) => {
                quantity = Some(q);
                price = Some(p);
            }
            Err(reason) => pair_failure = Some(reason),
        }
    }
    if pending {
        if let Some(reason) = pair_failure {
            return Err(reason);
        }
    }

    if !pending && (quantity.is_none() || price.is_none()) && tab.side_hint() == Some(side) {
        if let Some(delta) = deltas.get(&letter_key(item)) {
            if let Ok(q) = u32::try_from(delta.completed) {
                quantity = Some(q);
                price = Some(delta.collected);
                provenance = Provenance::UiInferred;
            }
        }
    }

    let price = price.ok_or(DiscardReason::NoPrice)?;
    let quantity = quantity.ok_or(DiscardReason::NoQuantity)?;
    if !config.quantity_in_bounds(quantity as u64) {
        return Err(DiscardReason::QuantityOutOfBounds);
    }

    Ok(Candidate {
        item_name: item.to_string(),
        quantity,
        price,
        timestamp,
        side,
        case,
        provenance,
        anchor: Some(AnchorText {
            timestamp_text: anchor.raw_timestamp_text.clone(),
            snippet: anchor.raw_text.clone(),
        }),
        member_texts: cluster.entries.iter().map(|e| e.raw_text.clone()).collect(),
    })
}

/// Synthesize trades for counter movements no parsed cluster accounts for.
pub fn infer_from_counters(
    deltas: &CounterDeltas,
    claimed: &HashSet<String>,
    tab: WindowTab,
    timestamp: NaiveDateTime,
    config: &ReconstructConfig,
) -> Vec<Candidate> {
    let Some(side) = tab.side_hint() else {
        return Vec::new();
    };

    deltas
        .iter()
        .filter(|(key, _)| !claimed.contains(*key))
        .filter_map(|(_, delta)| {
            let quantity = u32::try_from(delta.completed).ok()?;
            if !config.quantity_in_bounds(quantity as u64) || delta.collected == 0 {
                return None;
            }
            Some(Candidate {
                item_name: delta.item_name.clone(),
                quantity,
                price: delta.collected,
                timestamp,
                side,
                case: Case::Collect,
                provenance: Provenance::UiInferred,
                anchor: None,
                member_texts: Vec::new(),
            })
        })
        .collect()
}

fn order_unit_price(cluster: &Cluster) -> Option<u64> {
    [EntryKind::Placed, EntryKind::Listed]
        .into_iter()
        .filter_map(|kind| cluster.first_of(kind))
        .find_map(LogEntry::unit_price)
}

fn exact_quotient(total: u64, unit: u64) -> Option<u32> {
    if unit == 0 || total % unit != 0 {
        return None;
    }
    u32::try_from(total / unit).ok()
}

/// Units actually bought out of a partially withdrawn order. The two unit
/// prices must match exactly; anything else is most likely a cancel and
/// re-order at a different price.
fn placed_minus_withdrawn(cluster: &Cluster) -> Result<(u32, u64), DiscardReason> {
    let placed = cluster
        .first_of(EntryKind::Placed)
        .ok_or(DiscardReason::NoQuantity)?;
    let withdrew = cluster
        .first_of(EntryKind::Withdrew)
        .ok_or(DiscardReason::NoQuantity)?;

    let (Some(placed_qty), Some(withdrawn_qty)) = (placed.quantity, withdrew.quantity) else {
        return Err(DiscardReason::NoQuantity);
    };
    let (Some(placed_unit), Some(withdrawn_unit)) = (placed.unit_price(), withdrew.unit_price())
    else {
        return Err(DiscardReason::NoPrice);
    };
    if placed_unit != withdrawn_unit {
        return Err(DiscardReason::UnitPriceMismatch);
    }
    if withdrawn_qty >= placed_qty {
        return Err(DiscardReason::NoQuantity);
    }

    let bought = placed_qty - withdrawn_qty;
    Ok((bought, bought as u64 * placed_unit))
}
