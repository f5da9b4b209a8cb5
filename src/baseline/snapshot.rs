use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{Sample, TradeKey, UiCounters, WindowTab, TIMESTAMP_FORMAT};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const LAST_OVERVIEW_TEXT: &str = "last_overview_text";
pub const LAST_PROCESSED_TIMESTAMP: &str = "last_processed_timestamp";
pub const LAST_UI_COUNTERS_PREFIX: &str = "last_ui_counters:";
pub const OCCURRENCE_STATE: &str = "occurrence_state";
pub const LAST_CANDIDATE_KEYS: &str = "last_candidate_keys";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyCount {
    #[serde(flatten)]
    key: TradeKey,
    count: u32,
}

/// What the last sample that produced a save looked like.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineSnapshot {
    pub last_full_text: String,
    pub last_processed_timestamp: Option<NaiveDateTime>,
    pub counters: HashMap<WindowTab, UiCounters>,
    /// Multiset of the candidate keys that sample carried.
    pub last_candidate_keys: BTreeMap<TradeKey, u32>,
}

impl BaselineSnapshot {
    /// Rebuild from persisted key/value pairs. Undecodable values are
    /// logged and treated as absent.
    pub fn from_state(state: &HashMap<String, String>) -> Self {
        let mut snapshot = BaselineSnapshot {
            last_full_text: state.get(LAST_OVERVIEW_TEXT).cloned().unwrap_or_default(),
            ..Default::default()
        };

        if let Some(raw) = state.get(LAST_PROCESSED_TIMESTAMP) {
            match NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
                Ok(ts) => snapshot.last_processed_timestamp = Some(ts),
                Err(err) => log_warn!("ignoring stored baseline timestamp '{raw}': {err}"),
            }
        }

        for (key, raw) in state {
            let Some(tab) = key
                .strip_prefix(LAST_UI_COUNTERS_PREFIX)
                .and_then(WindowTab::parse)
            else {
                continue;
            };
            match serde_json::from_str::<UiCounters>(raw) {
                Ok(counters) => {
                    snapshot.counters.insert(tab, counters);
                }
                Err(err) => log_warn!("ignoring stored counters for {key}: {err}"),
            }
        }

        if let Some(raw) = state.get(LAST_CANDIDATE_KEYS) {
            match serde_json::from_str::<Vec<KeyCount>>(raw) {
                Ok(records) => {
                    snapshot.last_candidate_keys =
                        records.into_iter().map(|r| (r.key, r.count)).collect();
                }
                Err(err) => log_warn!("ignoring stored candidate keys: {err}"),
            }
        }

        snapshot
    }

    /// Key/value pairs to persist after `tab`'s sample advanced the baseline.
    pub fn to_state(&self, tab: WindowTab) -> anyhow::Result<Vec<(String, String)>> {
        let mut entries = vec![(LAST_OVERVIEW_TEXT.to_string(), self.last_full_text.clone())];

        if let Some(ts) = self.last_processed_timestamp {
            entries.push((
                LAST_PROCESSED_TIMESTAMP.to_string(),
                ts.format(TIMESTAMP_FORMAT).to_string(),
            ));
        }
        if let Some(counters) = self.counters.get(&tab) {
            entries.push((
                format!("{LAST_UI_COUNTERS_PREFIX}{}", tab.as_str()),
                serde_json::to_string(counters)?,
            ));
        }

        let keys: Vec<KeyCount> = self
            .last_candidate_keys
            .iter()
            .map(|(key, count)| KeyCount {
                key: key.clone(),
                count: *count,
            })
            .collect();
        entries.push((LAST_CANDIDATE_KEYS.to_string(), serde_json::to_string(&keys)?));

        Ok(entries)
    }

    /// Nothing has ever been saved: the next sample is a first-scan import.
    pub fn is_first_scan(&self) -> bool {
        self.last_full_text.is_empty() && self.last_processed_timestamp.is_none()
    }

    pub fn counters_for(&self, tab: WindowTab) -> Option<&UiCounters> {
        self.counters.get(&tab)
    }

    /// Same text and same counters for the sample's tab as the baseline.
    pub fn is_unchanged(&self, sample: &Sample) -> bool {
        if self.is_first_scan() || sample.text != self.last_full_text {
            return false;
        }
        match self.counters_for(sample.tab) {
            Some(counters) => *counters == sample.counters,
            None => sample.counters.is_empty(),
        }
    }

    pub fn prior_count(&self, key: &TradeKey) -> u32 {
        self.last_candidate_keys.get(key).copied().unwrap_or(0)
    }

    /// Move the baseline to `sample`. Only called once at least one row of
    /// the sample was durably saved.
    pub fn advance(
        &mut self,
        sample: &Sample,
        newest: Option<NaiveDateTime>,
        candidate_keys: BTreeMap<TradeKey, u32>,
    ) {
        self.last_full_text = sample.text.clone();
        if let Some(newest) = newest {
            self.last_processed_timestamp = Some(match self.last_processed_timestamp {
                Some(current) => current.max(newest),
                None => newest,
            });
        }
        self.counters.insert(sample.tab, sample.counters.clone());
        self.last_candidate_keys = candidate_keys;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemCounter, Side};
    use chrono::NaiveDate;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 12)
            .unwrap()
            .and_hms_opt(4, minute, 0)
            .unwrap()
    }

    fn sample() -> Sample {
        let mut counters = UiCounters::new();
        counters.insert(
            "Magical Shard".into(),
            ItemCounter {
                completed_count: 3,
                collected_amount: 900,
            },
        );
        Sample::new("2025.10.12 04.04 Transaction of Magical Shard", WindowTab::Sell).with_counters(counters)
    }

    #[test]
    fn advance_then_persist_roundtrip() {
        let mut snapshot = BaselineSnapshot::default();
        assert!(snapshot.is_first_scan());

        let key = TradeKey {
            item_name: "Magical Shard".into(),
            quantity: 1,
            price: 300,
            side: Side::Sell,
            timestamp: at(4),
        };
        let mut keys = BTreeMap::new();
        keys.insert(key.clone(), 2);
        snapshot.advance(&sample(), Some(at(4)), keys);

        let state: HashMap<String, String> = snapshot.to_state(WindowTab::Sell).unwrap().into_iter().collect();
        assert_eq!(state[LAST_PROCESSED_TIMESTAMP], "2025-10-12 04:04");
        assert!(state.contains_key("last_ui_counters:sell"));

        let restored = BaselineSnapshot::from_state(&state);
        assert_eq!(restored, snapshot);
        assert_eq!(restored.prior_count(&key), 2);
    }

    #[test]
    fn unchanged_sample_detection() {
        let mut snapshot = BaselineSnapshot::default();
        let sample = sample();
        assert!(!snapshot.is_unchanged(&sample));

        snapshot.advance(&sample, Some(at(4)), BTreeMap::new());
        assert!(snapshot.is_unchanged(&sample));

        let mut moved = sample.clone();
        moved.counters.insert(
            "Magical Shard".into(),
            ItemCounter {
                completed_count: 4,
                collected_amount: 1_200,
            },
        );
        assert!(!snapshot.is_unchanged(&moved));
    }

    #[test]
    fn baseline_timestamp_never_moves_backwards() {
        let mut snapshot = BaselineSnapshot::default();
        snapshot.advance(&sample(), Some(at(9)), BTreeMap::new());
        snapshot.advance(&sample(), Some(at(4)), BTreeMap::new());
        assert_eq!(snapshot.last_processed_timestamp, Some(at(9)));
    }

    #[test]
    fn corrupt_values_are_ignored() {
        let mut state = HashMap::new();
        state.insert(LAST_PROCESSED_TIMESTAMP.to_string(), "garbage".to_string());
        state.insert("last_ui_counters:buy".to_string(), "{".to_string());
        let snapshot = BaselineSnapshot::from_state(&state);
        assert_eq!(snapshot.last_processed_timestamp, None);
        assert!(snapshot.counters.is_empty());
    }
}
