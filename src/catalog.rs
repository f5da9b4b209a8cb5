//! Known-item whitelist with fuzzy correction of OCR'd names.

use std::{collections::HashMap, fs, path::Path, sync::Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::BoundedCache;
use crate::parsing::confusables::letter_key;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Static hint for transactions whose surrounding context scrolled away.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    MostLikelyBuy,
    MostLikelySell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    #[serde(default)]
    pub category: Option<ItemCategory>,
}

pub struct ItemCatalog {
    items: Vec<CatalogItem>,
    by_key: HashMap<String, usize>,
    threshold: f64,
    cache: Mutex<BoundedCache<String, Option<usize>>>,
}

impl ItemCatalog {
    pub fn new(items: Vec<CatalogItem>, threshold: f64, cache_capacity: usize) -> Self {
        let by_key = items
            .iter()
            .enumerate()
            .map(|(idx, item)| (letter_key(&item.name), idx))
            .collect();

        Self {
            items,
            by_key,
            threshold,
            cache: Mutex::new(BoundedCache::new(cache_capacity, None)),
        }
    }

    /// An empty catalog disables whitelisting: any cleaned name is accepted.
    pub fn permissive() -> Self {
        Self::new(Vec::new(), 1.0, 1)
    }

    pub fn load(path: &Path, threshold: f64, cache_capacity: usize) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read item catalog {}", path.display()))?;
        let items: Vec<CatalogItem> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse item catalog {}", path.display()))?;
        Ok(Self::new(items, threshold, cache_capacity))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Map an OCR'd item name to its canonical catalog spelling.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let cleaned = clean_item_name(raw);
        let key = letter_key(&cleaned);
        if key.chars().filter(|c| c.is_ascii_alphabetic()).count() < 2 {
            return None;
        }

        if self.items.is_empty() {
            return Some(cleaned);
        }

        if let Some(&idx) = self.by_key.get(&key) {
            return Some(self.items[idx].name.clone());
        }

        let cached = self
            .cache
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(&key));
        let best = match cached {
            Some(best) => best,
            None => {
                let best = self.best_match(&key);
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(key.clone(), best);
                }
                best
            }
        };

        match best {
            Some(idx) => Some(self.items[idx].name.clone()),
            None => {
                log_debug!("item '{cleaned}' not in catalog, dropping");
                None
            }
        }
    }

    pub fn category(&self, name: &str) -> Option<ItemCategory> {
        self.by_key
            .get(&letter_key(name))
            .and_then(|&idx| self.items[idx].category)
    }

    fn best_match(&self, key: &str) -> Option<usize> {
        self.by_key
            .iter()
            .map(|(candidate, &idx)| (strsim::jaro_winkler(key, candidate), idx))
            .filter(|(score, _)| *score >= self.threshold)
            .max_by(|(lhs, _), (rhs, _)| lhs.total_cmp(rhs))
            .map(|(_, idx)| idx)
    }
}

/// Strip UI debris around an item name and collapse whitespace.
pub fn clean_item_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '\'' | '-' | ':' | '(' | ')' | '[' | ']') {
                c
            } else {
                ' '
            }
        })
        .collect();

    let words: Vec<&str> = kept.split_whitespace().collect();
    let trimmed = words
        .iter()
        .skip_while(|word| matches!(word.to_ascii_lowercase().as_str(), "of" | "an" | "a" | "the"))
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    trimmed
        .trim_matches(|c: char| matches!(c, '-' | ':' | '\''))
        .trim()
        .to_string()
}
