use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::parsing::confusables::canonical_text;
use crate::parsing::Segmenter;
use crate::reconstruct::{AnchorText, Candidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Novelty {
    Novel,
    /// The same timestamp and snippet was already in the previous sample.
    SeenInPrior,
    /// Older than the baseline and every supporting line was already visible.
    StaleWithoutNewText,
    /// The store already holds a row for this occurrence.
    AlreadyStored,
}

impl Novelty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Novelty::Novel => "novel",
            Novelty::SeenInPrior => "seen in previous sample",
            Novelty::StaleWithoutNewText => "older than baseline without new text",
            Novelty::AlreadyStored => "already stored",
        }
    }
}

/// Text index of the baseline sample.
#[derive(Debug, Clone, Default)]
pub struct PriorText {
    anchors: HashMap<(String, String), u32>,
    snippets: HashSet<String>,
    last_timestamp: Option<NaiveDateTime>,
}

impl PriorText {
    pub fn build(text: &str, segmenter: &Segmenter, last_timestamp: Option<NaiveDateTime>) -> Self {
        let mut prior = PriorText {
            last_timestamp,
            ..Default::default()
        };
        for segment in segmenter.segment(text).segments {
            let ts = canonical_text(segment.timestamp_text.as_deref().unwrap_or_default());
            let snippet = canonical_text(&segment.snippet);
            *prior.anchors.entry((ts, snippet.clone())).or_insert(0) += 1;
            prior.snippets.insert(snippet);
        }
        prior
    }

    fn seen_count(&self, anchor: &AnchorText) -> u32 {
        self.anchors
            .get(&anchor_key(anchor))
            .copied()
            .unwrap_or(0)
    }

    fn has_new_text(&self, candidate: &Candidate) -> bool {
        candidate
            .member_texts
            .iter()
            .any(|text| !self.snippets.contains(&canonical_text(text)))
    }

    /// Strictly newer than anything the baseline sample held.
    pub fn is_newer(&self, ts: NaiveDateTime) -> bool {
        self.last_timestamp.map_or(true, |last| ts > last)
    }
}

pub fn anchor_key(anchor: &AnchorText) -> (String, String) {
    (canonical_text(&anchor.timestamp_text), canonical_text(&anchor.snippet))
}

/// Running per-sample ordinals so identical candidates in one sample are
/// told apart.
#[derive(Debug)]
pub struct Ordinals<K> {
    seen: HashMap<K, u32>,
}

impl<K> Default for Ordinals<K> {
    fn default() -> Self {
        Self {
            seen: HashMap::new(),
        }
    }
}

impl<K: std::hash::Hash + Eq> Ordinals<K> {
    /// Zero-based position of this occurrence of `key` within the sample.
    pub fn next(&mut self, key: K) -> u32 {
        let slot = self.seen.entry(key).or_insert(0);
        let ordinal = *slot;
        *slot += 1;
        ordinal
    }
}

/// Novelty of a candidate. Any one of the three signals blocks a save;
/// a candidate strictly newer than the baseline skips the text signals.
/// Counter-inferred candidates carry no log text and only face the store
/// check.
///
/// `anchor_ordinal` counts earlier candidates with the same anchor text in
/// this sample, `key_ordinal` earlier candidates with the same trade key.
pub fn assess(
    candidate: &Candidate,
    prior: &PriorText,
    anchor_ordinal: u32,
    key_ordinal: u32,
    stored_rows: u32,
) -> Novelty {
    if let Some(anchor) = &candidate.anchor {
        if !prior.is_newer(candidate.timestamp) {
            if prior.seen_count(anchor) > anchor_ordinal {
                return Novelty::SeenInPrior;
            }

            let older = prior
                .last_timestamp
                .is_some_and(|last| candidate.timestamp < last);
            if older && !prior.has_new_text(candidate) {
                return Novelty::StaleWithoutNewText;
            }
        }
    }

    if stored_rows > key_ordinal {
        return Novelty::AlreadyStored;
    }
    Novelty::Novel
}
