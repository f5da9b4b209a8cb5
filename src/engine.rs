//! Pure, per-sample reconstruction: text in, validated candidates out.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDateTime, Timelike};

use crate::catalog::ItemCatalog;
use crate::models::{Sample, UiCounters};
use crate::oracle::{CachedPriceOracle, NoOracle, PriceBounds, PriceOracle, StaticPriceOracle};
use crate::parsing::confusables::letter_key;
use crate::parsing::{Extractor, RuleSet, Segmenter, TimestampParser};
use crate::reconstruct::plausibility::validate;
use crate::reconstruct::{
    build_clusters, classify, counter_deltas, infer_from_counters, reconcile, Candidate,
    ClusterVerdict, DiscardReason, ReconstructConfig,
};
use crate::settings::EngineSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Discard {
    pub item_name: Option<String>,
    pub reason: DiscardReason,
}

#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub candidates: Vec<Candidate>,
    pub discards: Vec<Discard>,
    pub entry_count: usize,
    pub cluster_count: usize,
    /// Newest game timestamp among the sample's entries.
    pub max_timestamp: Option<NaiveDateTime>,
}

pub struct ReconstructionEngine {
    segmenter: Segmenter,
    extractor: Extractor,
    catalog: ItemCatalog,
    oracle: Arc<dyn PriceOracle>,
    config: ReconstructConfig,
}

impl ReconstructionEngine {
    pub fn new(
        catalog: ItemCatalog,
        oracle: Arc<dyn PriceOracle>,
        config: ReconstructConfig,
    ) -> Result<Self> {
        let timestamps = TimestampParser::new()?;
        let segmenter = Segmenter::new(timestamps.clone(), config.max_snippet_chars)?;
        let extractor = Extractor::new(RuleSet::new()?, timestamps, config.extraction_limits());

        Ok(Self {
            segmenter,
            extractor,
            catalog,
            oracle,
            config,
        })
    }

    /// Build the catalog and oracle the settings point at.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self> {
        let extraction = &settings.extraction;
        let catalog = match &extraction.catalog_path {
            Some(path) => ItemCatalog::load(
                path,
                extraction.fuzzy_threshold,
                extraction.fuzzy_cache_capacity,
            )?,
            None => {
                log_warn!("no item catalog configured, accepting any item name");
                ItemCatalog::permissive()
            }
        };

        let oracle: Arc<dyn PriceOracle> = match &settings.oracle.price_table_path {
            Some(path) => Arc::new(CachedPriceOracle::new(
                StaticPriceOracle::load(path)?,
                settings.oracle.cache_capacity,
                Duration::from_secs(settings.oracle.cache_ttl_secs),
            )),
            None => Arc::new(NoOracle),
        };

        log_info!(
            "engine ready: {} catalog items, oracle {}",
            catalog.len(),
            if settings.oracle.price_table_path.is_some() { "enabled" } else { "disabled" }
        );
        Self::new(catalog, oracle, settings.reconstruct_config())
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ReconstructConfig {
        &self.config
    }

    /// Segment, extract, cluster, classify and reconcile one sample, then
    /// run every candidate through the plausibility gate.
    ///
    /// `previous_counters` are the baseline counters for the sample's tab.
    pub fn reconstruct(
        &self,
        sample: &Sample,
        previous_counters: Option<&UiCounters>,
        first_scan: bool,
    ) -> Reconstruction {
        let segmentation = self.segmenter.segment(&sample.text);
        let entries: Vec<_> = segmentation
            .segments
            .iter()
            .filter_map(|segment| self.extractor.extract(segment, &self.catalog))
            .collect();

        let mut result = Reconstruction {
            entry_count: entries.len(),
            max_timestamp: entries.iter().filter_map(|e| e.timestamp).max(),
            ..Default::default()
        };

        let clusters = build_clusters(entries, &self.config, first_scan);
        result.cluster_count = clusters.len();

        let deltas = counter_deltas(&sample.counters, previous_counters);
        let mut claimed = HashSet::new();

        for cluster in &clusters {
            let verdict = classify(cluster, sample.tab, &self.catalog);
            if let (Some(item), ClusterVerdict::Trade { .. } | ClusterVerdict::PendingAdjustment) =
                (cluster.item_name(), verdict)
            {
                claimed.insert(letter_key(item));
            }

            let outcome = reconcile(cluster, verdict, sample.tab, &deltas, &self.config)
                .and_then(|candidate| self.check(candidate));
            match outcome {
                Ok(candidate) => result.candidates.push(candidate),
                Err(reason) => self.discard(&mut result, cluster.item_name(), reason),
            }
        }

        // Counter movement is observed at capture time, not at any visible
        // log line, so inferred trades carry the capture minute.
        let observed_at = truncate_to_minute(sample.captured_at.naive_utc());
        for candidate in infer_from_counters(&deltas, &claimed, sample.tab, observed_at, &self.config) {
            let item = candidate.item_name.clone();
            match self.check(candidate) {
                Ok(candidate) => {
                    log_info!("inferred {} from UI counters", candidate.key());
                    result.candidates.push(candidate);
                }
                Err(reason) => self.discard(&mut result, Some(&item), reason),
            }
        }

        result
    }

    fn check(&self, candidate: Candidate) -> Result<Candidate, DiscardReason> {
        let bounds = self.bounds_for(&candidate.item_name);
        validate(candidate, bounds.as_ref(), &self.config)
    }

    /// Oracle lookup; an unavailable oracle degrades to no bounds.
    fn bounds_for(&self, item: &str) -> Option<PriceBounds> {
        match self.oracle.bounds(item) {
            Ok(bounds) => bounds,
            Err(err) => {
                log_warn!("price oracle unavailable for {item}, accepting: {err:#}");
                None
            }
        }
    }

    fn discard(&self, result: &mut Reconstruction, item: Option<&str>, reason: DiscardReason) {
        let label = item.unwrap_or("<unknown>");
        if reason.is_implausible() {
            log_info!("dropping {label}: {reason}");
        } else {
            log_debug!("dropping {label}: {reason}");
        }
        result.discards.push(Discard {
            item_name: item.map(str::to_string),
            reason,
        });
    }
}

fn truncate_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}
