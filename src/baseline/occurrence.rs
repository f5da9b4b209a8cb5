use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::TradeKey;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OccurrenceRecord {
    #[serde(flatten)]
    key: TradeKey,
    next_index: u32,
}

/// What to do with a candidate once it passed the novelty gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceSlot {
    /// The candidate re-observes an already stored row; nothing to insert.
    Reuse(u32),
    /// Store the candidate under this fresh index.
    Allocate(u32),
}

/// Next free occurrence index per trade key. Indices only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceState {
    next: HashMap<TradeKey, u32>,
}

impl OccurrenceState {
    pub fn from_json(raw: &str) -> Result<Self> {
        let records: Vec<OccurrenceRecord> =
            serde_json::from_str(raw).context("failed to decode occurrence state")?;
        Ok(Self {
            next: records.into_iter().map(|r| (r.key, r.next_index)).collect(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let mut records: Vec<OccurrenceRecord> = self
            .next
            .iter()
            .map(|(key, next_index)| OccurrenceRecord {
                key: key.clone(),
                next_index: *next_index,
            })
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        serde_json::to_string(&records).context("failed to encode occurrence state")
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    pub fn next_index(&self, key: &TradeKey) -> u32 {
        self.next.get(key).copied().unwrap_or(0)
    }

    /// Decide the slot for the `ordinal`-th candidate with `key` in this sample.
    ///
    /// `stored_rows` is how many rows the store holds for the key and
    /// `prior_count` how many candidates with the key the previous saved
    /// sample carried.
    pub fn slot(&self, key: &TradeKey, stored_rows: u32, prior_count: u32, ordinal: u32) -> OccurrenceSlot {
        let next = self.next_index(key);
        if next > 0 && stored_rows >= next && prior_count > ordinal {
            return OccurrenceSlot::Reuse(next - 1);
        }
        OccurrenceSlot::Allocate(next.max(stored_rows))
    }

    /// Record that `index` is taken for `key`.
    pub fn commit(&mut self, key: &TradeKey, index: u32) {
        let entry = self.next.entry(key.clone()).or_insert(0);
        *entry = (*entry).max(index + 1);
    }

    /// Drop keys older than `retention` relative to `newest`.
    pub fn prune(&mut self, newest: NaiveDateTime, retention: Duration) -> usize {
        let cutoff = newest - retention;
        let before = self.next.len();
        self.next.retain(|key, _| key.timestamp >= cutoff);
        before - self.next.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use chrono::NaiveDate;

    fn key(day: u32) -> TradeKey {
        TradeKey {
            item_name: "Magical Shard".into(),
            quantity: 200,
            price: 585_585_000,
            side: Side::Sell,
            timestamp: NaiveDate::from_ymd_opt(2025, 10, day)
                .unwrap()
                .and_hms_opt(4, 4, 0)
                .unwrap(),
        }
    }

    #[test]
    fn same_minute_repeats_get_distinct_indices() {
        let mut state = OccurrenceState::default();
        let k = key(12);

        assert_eq!(state.slot(&k, 0, 0, 0), OccurrenceSlot::Allocate(0));
        state.commit(&k, 0);
        assert_eq!(state.slot(&k, 1, 0, 1), OccurrenceSlot::Allocate(1));
        state.commit(&k, 1);
        assert_eq!(state.next_index(&k), 2);
    }

    #[test]
    fn reobserved_candidate_reuses_slot() {
        let mut state = OccurrenceState::default();
        let k = key(12);
        state.commit(&k, 0);
        assert_eq!(state.slot(&k, 1, 1, 0), OccurrenceSlot::Reuse(0));
        // Not present in the prior sample: a genuinely new repeat.
        assert_eq!(state.slot(&k, 1, 0, 0), OccurrenceSlot::Allocate(1));
    }

    #[test]
    fn stored_rows_raise_the_floor() {
        let state = OccurrenceState::default();
        assert_eq!(state.slot(&key(12), 3, 0, 0), OccurrenceSlot::Allocate(3));
    }

    #[test]
    fn json_roundtrip_and_prune() {
        let mut state = OccurrenceState::default();
        state.commit(&key(1), 0);
        state.commit(&key(12), 4);

        let restored = OccurrenceState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(restored, state);

        let mut pruned = restored;
        let removed = pruned.prune(key(12).timestamp, Duration::days(7));
        assert_eq!(removed, 1);
        assert_eq!(pruned.next_index(&key(12)), 5);
        assert_eq!(pruned.next_index(&key(1)), 0);
    }
}
