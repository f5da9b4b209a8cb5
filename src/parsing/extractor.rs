use crate::catalog::ItemCatalog;
use crate::models::{EntryKind, LogEntry};

use super::confusables::normalize_number;
use super::rules::{ItemRegion, RuleSet};
use super::segmenter::Segment;
use super::timestamp::TimestampParser;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Bounds the extractor applies before any oracle is consulted.
#[derive(Debug, Clone)]
pub struct ExtractionLimits {
    pub min_quantity: u32,
    pub max_quantity: u32,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    rules: RuleSet,
    timestamps: TimestampParser,
    limits: ExtractionLimits,
}

impl Extractor {
    pub fn new(rules: RuleSet, timestamps: TimestampParser, limits: ExtractionLimits) -> Self {
        Self {
            rules,
            timestamps,
            limits,
        }
    }

    /// Turn one segment into a log entry. Entries without a resolvable game
    /// timestamp are discarded.
    pub fn extract(&self, segment: &Segment, catalog: &ItemCatalog) -> Option<LogEntry> {
        let raw_timestamp_text = segment.timestamp_text.clone().unwrap_or_default();
        let Some(timestamp) = self.timestamps.parse(&raw_timestamp_text) else {
            log_debug!(
                "discarding entry at offset {} without timestamp: {:?}",
                segment.offset,
                segment.snippet
            );
            return None;
        };

        let text = self.rules.repair(&segment.snippet);
        let (kind, sold_marker, item_region, anchor_end) = match self.rules.classify(&text) {
            Some((rule, found)) => (rule.kind, rule.sold_marker, rule.item_region, found.end()),
            None => (EntryKind::Other, false, ItemRegion::None, 0),
        };

        // Fallback rules match the price phrase itself, so their fields are
        // searched from the start of the snippet.
        let scan_from = match item_region {
            ItemRegion::AfterAnchor => anchor_end.min(text.len()),
            ItemRegion::SnippetStart | ItemRegion::None => 0,
        };

        let price_hit = self.find_price(&text, kind);
        let boundary = self
            .rules
            .price_boundary(&text, scan_from)
            .or(price_hit.map(|(start, _)| start))
            .unwrap_or(text.len());
        let quantity = self.find_quantity(&text, scan_from, boundary);
        // Totals are kept as read. Leading-digit repair needs the item's
        // price bounds and happens at validation.
        let price = price_hit.map(|(_, value)| value);

        let item_name = match item_region {
            ItemRegion::None => None,
            ItemRegion::AfterAnchor | ItemRegion::SnippetStart => {
                self.item_text(&text, scan_from, boundary)
            }
        }
        .and_then(|raw| catalog.resolve(&raw));

        Some(LogEntry {
            byte_offset: segment.offset,
            raw_timestamp_text,
            kind,
            item_name,
            quantity,
            price,
            timestamp: Some(timestamp),
            raw_text: segment.snippet.clone(),
            sold_marker,
        })
    }

    /// First price rule (in the kind's preference order) that yields a
    /// positive amount. Returns the match start and the amount.
    fn find_price(&self, text: &str, kind: EntryKind) -> Option<(usize, u64)> {
        self.rules.price_rules_for(kind).into_iter().find_map(|rule| {
            rule.pattern.captures_iter(text).find_map(|caps| {
                let whole = caps.get(0)?;
                let amount = normalize_number(caps.get(1)?.as_str())?;
                (amount > 0).then_some((whole.start(), amount))
            })
        })
    }

    /// Last plausible `xN` between the anchor and the price boundary.
    fn find_quantity(&self, text: &str, from: usize, boundary: usize) -> Option<u32> {
        let region = text.get(from..boundary.max(from))?;
        self.rules
            .quantity_pattern()
            .captures_iter(region)
            .filter_map(|caps| normalize_number(caps.get(1)?.as_str()))
            .filter(|qty| {
                *qty >= self.limits.min_quantity as u64 && *qty <= self.limits.max_quantity as u64
            })
            .last()
            .and_then(|qty| u32::try_from(qty).ok())
    }

    /// Text between `from` and the multiplier (or the price boundary when no
    /// multiplier parses).
    fn item_text(&self, text: &str, from: usize, boundary: usize) -> Option<String> {
        let region = text.get(from..boundary.max(from))?;
        let end = self
            .rules
            .quantity_pattern()
            .captures_iter(region)
            .filter(|caps| {
                caps.get(1)
                    .and_then(|m| normalize_number(m.as_str()))
                    .is_some()
            })
            .last()
            .and_then(|caps| caps.get(0))
            .map(|m| m.start())
            .unwrap_or(region.len());
        let name = region[..end].trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;

    fn extractor() -> Extractor {
        Extractor::new(
            RuleSet::new().unwrap(),
            TimestampParser::new().unwrap(),
            ExtractionLimits {
                min_quantity: 1,
                max_quantity: 100_000,
            },
        )
    }

    fn catalog() -> ItemCatalog {
        ItemCatalog::new(
            vec![
                CatalogItem {
                    name: "Magical Shard".into(),
                    category: None,
                },
                CatalogItem {
                    name: "Black Stone (Armor)".into(),
                    category: None,
                },
            ],
            0.88,
            16,
        )
    }

    fn segment(snippet: &str) -> Segment {
        Segment {
            offset: 0,
            timestamp_text: Some("2025-10-12 04:04".into()),
            snippet: snippet.into(),
        }
    }

    #[test]
    fn extracts_clean_transaction() {
        let entry = extractor()
            .extract(
                &segment("Transaction of Magical Shard x200 worth 585,585,000 Silver has been completed"),
                &catalog(),
            )
            .unwrap();
        assert_eq!(entry.kind, EntryKind::Transaction);
        assert_eq!(entry.item_name.as_deref(), Some("Magical Shard"));
        assert_eq!(entry.quantity, Some(200));
        assert_eq!(entry.price, Some(585_585_000));
        assert!(!entry.sold_marker);
    }

    #[test]
    fn extracts_through_ocr_noise() {
        let entry = extractor()
            .extract(
                &segment("Transacti0n of Magica1 Shard ×2OO w0rth 5B5,58 5,OOO Si1ver"),
                &catalog(),
            )
            .unwrap();
        assert_eq!(entry.item_name.as_deref(), Some("Magical Shard"));
        assert_eq!(entry.quantity, Some(200));
        assert_eq!(entry.price, Some(585_585_000));
    }

    #[test]
    fn order_kinds_prefer_for_price() {
        let entry = extractor()
            .extract(
                &segment("Placed an order of Black Stone (Armor) x1000 for 22,500,000 Silver"),
                &catalog(),
            )
            .unwrap();
        assert_eq!(entry.kind, EntryKind::Placed);
        assert_eq!(entry.item_name.as_deref(), Some("Black Stone (Armor)"));
        assert_eq!(entry.quantity, Some(1000));
        assert_eq!(entry.price, Some(22_500_000));
        assert_eq!(entry.unit_price(), Some(22_500));
    }

    #[test]
    fn sold_sets_marker() {
        let entry = extractor()
            .extract(&segment("Sold Magical Shard x2 for 5,855,850 Silver"), &catalog())
            .unwrap();
        assert_eq!(entry.kind, EntryKind::Transaction);
        assert!(entry.sold_marker);
        assert_eq!(entry.price, Some(5_855_850));
    }

    #[test]
    fn missing_timestamp_discards_entry() {
        let mut seg = segment("Listed Magical Shard x2 for 5,855,850 Silver");
        seg.timestamp_text = None;
        assert!(extractor().extract(&seg, &catalog()).is_none());
    }

    #[test]
    fn non_dividing_total_is_kept_as_read() {
        let entry = extractor()
            .extract(
                &segment("Transaction of Magical Shard x7 worth 126,185 Silver"),
                &catalog(),
            )
            .unwrap();
        assert_eq!(entry.quantity, Some(7));
        assert_eq!(entry.price, Some(126_185));
    }

    #[test]
    fn bare_price_does_not_absorb_the_multiplier() {
        let entry = extractor()
            .extract(&segment("Magical Shard x200 585,585,000 Silver"), &catalog())
            .unwrap();
        assert_eq!(entry.kind, EntryKind::Transaction);
        assert_eq!(entry.item_name.as_deref(), Some("Magical Shard"));
        assert_eq!(entry.quantity, Some(200));
        assert_eq!(entry.price, Some(585_585_000));
    }

    #[test]
    fn quantity_out_of_bounds_is_ignored() {
        let entry = extractor()
            .extract(
                &segment("Listed Magical Shard x999999 for 1,000 Silver"),
                &catalog(),
            )
            .unwrap();
        assert_eq!(entry.quantity, None);
        assert_eq!(entry.item_name.as_deref(), Some("Magical Shard"));
    }

    #[test]
    fn unknown_item_yields_no_name() {
        let entry = extractor()
            .extract(&segment("Listed Something Else x2 for 1,000 Silver"), &catalog())
            .unwrap();
        assert_eq!(entry.item_name, None);
    }

    #[test]
    fn truncated_anchor_still_yields_fields() {
        let entry = extractor()
            .extract(
                &segment("Shard x200 worth 585,585,000 Silver has been completed"),
                &catalog(),
            )
            .unwrap();
        assert_eq!(entry.kind, EntryKind::Transaction);
        assert_eq!(entry.quantity, Some(200));
        assert_eq!(entry.price, Some(585_585_000));
    }
}
