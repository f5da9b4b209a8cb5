//! Per-sample orchestration: reconstruct, gate on novelty, assign
//! occurrence indices, persist, and advance the baseline.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Duration;
use serde::Serialize;

use crate::baseline::snapshot::OCCURRENCE_STATE;
use crate::baseline::{
    anchor_key, assess, BaselineSnapshot, Novelty, OccurrenceSlot, OccurrenceState, Ordinals,
    PriorText,
};
use crate::db::{Database, InsertOutcome, TradeRecord};
use crate::engine::ReconstructionEngine;
use crate::models::{Sample, Transaction};
use crate::reconstruct::DiscardReason;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// What one sample did to the store.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Same text and counters as the baseline; nothing was reconstructed.
    pub unchanged: bool,
    pub entries: usize,
    pub clusters: usize,
    pub candidates: usize,
    pub saved: Vec<Transaction>,
    /// Re-observations and store conflicts.
    pub duplicates: usize,
    /// Candidates the novelty gate held back.
    pub blocked: usize,
    pub discarded: Vec<(Option<String>, DiscardReason)>,
    pub baseline_advanced: bool,
}

pub struct Ingestor {
    engine: ReconstructionEngine,
    db: Database,
    baseline: BaselineSnapshot,
    occurrences: OccurrenceState,
    retention: Duration,
}

impl Ingestor {
    /// Load the baseline and occurrence state from the store.
    pub async fn load(engine: ReconstructionEngine, db: Database, retention_days: i64) -> Result<Self> {
        let state = db.load_process_state().await?;
        let baseline = BaselineSnapshot::from_state(&state);
        let occurrences = match state.get(OCCURRENCE_STATE) {
            Some(raw) => OccurrenceState::from_json(raw).unwrap_or_else(|err| {
                log_warn!("starting with empty occurrence state: {err:#}");
                OccurrenceState::default()
            }),
            None => OccurrenceState::default(),
        };

        log_info!(
            "loaded baseline (first scan: {}, tracked keys: {})",
            baseline.is_first_scan(),
            occurrences.len()
        );

        Ok(Self {
            engine,
            db,
            baseline,
            occurrences,
            retention: Duration::days(retention_days.max(1)),
        })
    }

    pub fn baseline(&self) -> &BaselineSnapshot {
        &self.baseline
    }

    pub fn occurrences(&self) -> &OccurrenceState {
        &self.occurrences
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn ingest(&mut self, sample: Sample) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        if self.baseline.is_unchanged(&sample) {
            log_debug!("sample unchanged since last save, skipping");
            report.unchanged = true;
            return Ok(report);
        }

        let first_scan = self.baseline.is_first_scan();
        let reconstruction = self.engine.reconstruct(
            &sample,
            self.baseline.counters_for(sample.tab),
            first_scan,
        );
        report.entries = reconstruction.entry_count;
        report.clusters = reconstruction.cluster_count;
        report.candidates = reconstruction.candidates.len();
        report.discarded = reconstruction
            .discards
            .iter()
            .map(|d| (d.item_name.clone(), d.reason))
            .collect();

        let prior = PriorText::build(
            &self.baseline.last_full_text,
            self.engine.segmenter(),
            self.baseline.last_processed_timestamp,
        );

        if let Some(newest) = reconstruction
            .max_timestamp
            .max(self.baseline.last_processed_timestamp)
        {
            let pruned = self.occurrences.prune(newest, self.retention);
            if pruned > 0 {
                log_debug!("pruned {pruned} expired occurrence keys");
            }
        }

        let mut anchor_ordinals = Ordinals::default();
        let mut key_ordinals = Ordinals::default();
        let mut candidate_keys = BTreeMap::new();

        for candidate in reconstruction.candidates {
            let key = candidate.key();
            let key_ordinal = key_ordinals.next(key.clone());
            let anchor_ordinal = candidate
                .anchor
                .as_ref()
                .map(|anchor| anchor_ordinals.next(anchor_key(anchor)))
                .unwrap_or(0);
            *candidate_keys.entry(key.clone()).or_insert(0u32) += 1;

            let stored_rows = self.db.count_trade_rows(&key).await?;
            let novelty = assess(&candidate, &prior, anchor_ordinal, key_ordinal, stored_rows);
            if novelty != Novelty::Novel {
                log_debug!("holding back {key}: {}", novelty.as_str());
                report.blocked += 1;
                continue;
            }

            let prior_count = self.baseline.prior_count(&key);
            let index = match self.occurrences.slot(&key, stored_rows, prior_count, key_ordinal) {
                OccurrenceSlot::Reuse(index) => {
                    log_debug!("{key} re-observed as occurrence {index}");
                    report.duplicates += 1;
                    continue;
                }
                OccurrenceSlot::Allocate(index) => index,
            };

            self.occurrences.commit(&key, index);
            let record = TradeRecord::new(candidate.into_transaction(index));
            match self.db.commit_trade(record.clone(), self.occurrences.to_json()?).await? {
                InsertOutcome::Inserted(id) => {
                    log_info!("saved trade #{id}: {key} occurrence {index}");
                    report.saved.push(record.transaction);
                }
                InsertOutcome::Duplicate => {
                    log_debug!("store already holds {key} occurrence {index}");
                    report.duplicates += 1;
                }
            }
        }

        if !report.saved.is_empty() {
            self.baseline
                .advance(&sample, reconstruction.max_timestamp, candidate_keys);
            self.db
                .save_process_state(self.baseline.to_state(sample.tab)?)
                .await?;
            report.baseline_advanced = true;
        }

        log_info!(
            "sample on {} tab: {} entries, {} clusters, {} candidates, {} saved, {} duplicate, {} held back, {} dropped",
            sample.tab.as_str(),
            report.entries,
            report.clusters,
            report.candidates,
            report.saved.len(),
            report.duplicates,
            report.blocked,
            report.discarded.len()
        );

        Ok(report)
    }
}
