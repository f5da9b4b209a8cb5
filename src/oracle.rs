//! Market price oracle used for unit-price plausibility checks.

use std::{collections::HashMap, fs, path::Path, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::BoundedCache;
use crate::parsing::confusables::letter_key;

/// Per-unit price range the market allows for an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBounds {
    pub min_price: u64,
    pub max_price: u64,
    pub base_price: u64,
}

impl PriceBounds {
    /// Whether `unit_price` lies within the bounds widened by `tolerance`.
    pub fn admits(&self, unit_price: f64, tolerance: f64) -> bool {
        let low = self.min_price as f64 * (1.0 - tolerance);
        let high = self.max_price as f64 * (1.0 + tolerance);
        unit_price >= low && unit_price <= high
    }
}

/// Best-effort lookup. `Ok(None)` means the item is unknown to the oracle;
/// `Err` means the oracle itself is unavailable.
pub trait PriceOracle: Send + Sync {
    fn bounds(&self, item_name: &str) -> Result<Option<PriceBounds>>;
}

/// Oracle that knows nothing; every plausibility check passes.
pub struct NoOracle;

impl PriceOracle for NoOracle {
    fn bounds(&self, _item_name: &str) -> Result<Option<PriceBounds>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct PriceRecord {
    name: String,
    #[serde(flatten)]
    bounds: PriceBounds,
}

/// Fixed price table read from a JSON array of `{name, minPrice, maxPrice, basePrice}`.
pub struct StaticPriceOracle {
    prices: HashMap<String, PriceBounds>,
}

impl StaticPriceOracle {
    pub fn new(entries: impl IntoIterator<Item = (String, PriceBounds)>) -> Self {
        Self {
            prices: entries
                .into_iter()
                .map(|(name, bounds)| (letter_key(&name), bounds))
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read price table {}", path.display()))?;
        let records: Vec<PriceRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse price table {}", path.display()))?;
        Ok(Self::new(records.into_iter().map(|r| (r.name, r.bounds))))
    }
}

impl PriceOracle for StaticPriceOracle {
    fn bounds(&self, item_name: &str) -> Result<Option<PriceBounds>> {
        Ok(self.prices.get(&letter_key(item_name)).copied())
    }
}

/// Caches another oracle's answers with a time-to-live. Errors are not cached.
pub struct CachedPriceOracle<O> {
    inner: O,
    cache: Mutex<BoundedCache<String, Option<PriceBounds>>>,
}

impl<O: PriceOracle> CachedPriceOracle<O> {
    pub fn new(inner: O, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Mutex::new(BoundedCache::new(capacity, Some(ttl))),
        }
    }
}

impl<O: PriceOracle> PriceOracle for CachedPriceOracle<O> {
    fn bounds(&self, item_name: &str) -> Result<Option<PriceBounds>> {
        let key = letter_key(item_name);
        if let Some(hit) = self.cache.lock().ok().and_then(|mut c| c.get(&key)) {
            return Ok(hit);
        }

        let fresh = self.inner.bounds(item_name)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, fresh);
        }
        Ok(fresh)
    }
}
