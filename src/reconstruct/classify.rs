use crate::catalog::{ItemCatalog, ItemCategory};
use crate::models::{Case, EntryKind, Side, WindowTab};

use super::cluster::Cluster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterVerdict {
    Trade { side: Side, case: Case },
    /// An order placed and partially withdrawn with no confirmed completion.
    /// Only a matching-unit-price inference can turn it into a trade.
    PendingAdjustment,
    NotATrade,
    Undetermined,
}

/// Which kinds a cluster contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindSet {
    pub transaction: bool,
    pub purchased: bool,
    pub placed: bool,
    pub listed: bool,
    pub withdrew: bool,
    pub other: bool,
    pub sold_marker: bool,
}

impl KindSet {
    pub fn of(cluster: &Cluster) -> Self {
        let mut set = KindSet::default();
        for entry in &cluster.entries {
            match entry.kind {
                EntryKind::Transaction => set.transaction = true,
                EntryKind::Purchased => set.purchased = true,
                EntryKind::Placed => set.placed = true,
                EntryKind::Listed => set.listed = true,
                EntryKind::Withdrew => set.withdrew = true,
                EntryKind::Other => set.other = true,
            }
            set.sold_marker |= entry.sold_marker;
        }
        set
    }

    fn confirmed(&self) -> bool {
        self.transaction || self.purchased
    }

    fn transaction_only(&self) -> bool {
        self.transaction && !self.purchased && !self.placed && !self.listed && !self.withdrew
    }
}

pub fn classify(cluster: &Cluster, tab: WindowTab, catalog: &ItemCatalog) -> ClusterVerdict {
    let Some(item) = cluster.item_name() else {
        return ClusterVerdict::NotATrade;
    };
    let kinds = KindSet::of(cluster);

    if !kinds.confirmed() {
        return if kinds.placed && kinds.withdrew {
            ClusterVerdict::PendingAdjustment
        } else {
            ClusterVerdict::NotATrade
        };
    }

    match resolve_side(&kinds, tab, catalog.category(item)) {
        Some(side) => ClusterVerdict::Trade {
            side,
            case: resolve_case(&kinds, side),
        },
        None => ClusterVerdict::Undetermined,
    }
}

/// Side cascade, first decisive rule wins.
pub fn resolve_side(kinds: &KindSet, tab: WindowTab, category: Option<ItemCategory>) -> Option<Side> {
    if kinds.sold_marker {
        return Some(Side::Sell);
    }
    if kinds.purchased {
        return Some(Side::Buy);
    }
    let sell_signals = kinds.listed || kinds.withdrew;
    let buy_signals = kinds.placed || kinds.purchased;
    if sell_signals && !buy_signals {
        return Some(Side::Sell);
    }
    if kinds.placed && kinds.transaction {
        return Some(Side::Buy);
    }
    if kinds.transaction_only() {
        match category {
            Some(ItemCategory::MostLikelyBuy) => return Some(Side::Buy),
            Some(ItemCategory::MostLikelySell) => return Some(Side::Sell),
            None => {}
        }
    }
    tab.side_hint()
}

pub fn resolve_case(kinds: &KindSet, side: Side) -> Case {
    match side {
        Side::Buy => {
            if !kinds.placed && !kinds.listed {
                Case::Collect
            } else if kinds.withdrew {
                Case::RelistPartial
            } else {
                Case::RelistFull
            }
        }
        Side::Sell => {
            if kinds.transaction_only() || (!kinds.listed && !kinds.withdrew) {
                Case::Collect
            } else if kinds.withdrew {
                Case::RelistPartial
            } else {
                Case::RelistFull
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;
    use crate::models::LogEntry;
    use crate::reconstruct::{build_clusters, ReconstructConfig};
    use chrono::NaiveDate;

    fn entry(offset: usize, kind: EntryKind, sold: bool) -> LogEntry {
        LogEntry {
            byte_offset: offset,
            raw_timestamp_text: "2025.10.12 04:04".into(),
            kind,
            item_name: Some("Magical Shard".into()),
            quantity: Some(1),
            price: Some(100),
            timestamp: NaiveDate::from_ymd_opt(2025, 10, 12)
                .unwrap()
                .and_hms_opt(4, 4, 0),
            raw_text: String::new(),
            sold_marker: sold,
        }
    }

    fn verdict(kinds: &[EntryKind], tab: WindowTab, catalog: &ItemCatalog) -> ClusterVerdict {
        let entries = kinds
            .iter()
            .enumerate()
            .map(|(idx, kind)| {
                let mut e = entry(idx * 10, *kind, false);
                // Keep purchases unpriced so they can share a cluster.
                if *kind == EntryKind::Purchased {
                    e.price = None;
                }
                e
            })
            .collect();
        let clusters = build_clusters(entries, &ReconstructConfig::default(), false);
        assert_eq!(clusters.len(), 1);
        classify(&clusters[0], tab, catalog)
    }

    fn trade(side: Side, case: Case) -> ClusterVerdict {
        ClusterVerdict::Trade { side, case }
    }

    #[test]
    fn sold_marker_wins() {
        let cluster = build_clusters(
            vec![entry(0, EntryKind::Transaction, true)],
            &ReconstructConfig::default(),
            false,
        );
        assert_eq!(
            classify(&cluster[0], WindowTab::Buy, &ItemCatalog::permissive()),
            trade(Side::Sell, Case::Collect)
        );
    }

    #[test]
    fn buy_side_cases() {
        let catalog = ItemCatalog::permissive();
        use EntryKind::*;
        assert_eq!(verdict(&[Purchased], WindowTab::Overview, &catalog), trade(Side::Buy, Case::Collect));
        assert_eq!(
            verdict(&[Transaction, Placed], WindowTab::Overview, &catalog),
            trade(Side::Buy, Case::RelistFull)
        );
        assert_eq!(
            verdict(&[Transaction, Placed, Withdrew], WindowTab::Overview, &catalog),
            trade(Side::Buy, Case::RelistPartial)
        );
    }

    #[test]
    fn sell_side_cases() {
        let catalog = ItemCatalog::permissive();
        use EntryKind::*;
        assert_eq!(
            verdict(&[Transaction, Listed], WindowTab::Overview, &catalog),
            trade(Side::Sell, Case::RelistFull)
        );
        assert_eq!(
            verdict(&[Transaction, Listed, Withdrew], WindowTab::Overview, &catalog),
            trade(Side::Sell, Case::RelistPartial)
        );
        assert_eq!(verdict(&[Transaction], WindowTab::Sell, &catalog), trade(Side::Sell, Case::Collect));
    }

    #[test]
    fn category_resolves_lone_historical_transactions() {
        let catalog = ItemCatalog::new(
            vec![CatalogItem {
                name: "Magical Shard".into(),
                category: Some(ItemCategory::MostLikelyBuy),
            }],
            0.88,
            4,
        );
        assert_eq!(
            verdict(&[EntryKind::Transaction], WindowTab::Sell, &catalog),
            trade(Side::Buy, Case::Collect)
        );
    }

    #[test]
    fn lone_transaction_without_hints_is_undetermined() {
        assert_eq!(
            verdict(&[EntryKind::Transaction], WindowTab::Overview, &ItemCatalog::permissive()),
            ClusterVerdict::Undetermined
        );
    }

    #[test]
    fn unconfirmed_clusters() {
        let catalog = ItemCatalog::permissive();
        use EntryKind::*;
        assert_eq!(verdict(&[Placed, Withdrew], WindowTab::Buy, &catalog), ClusterVerdict::PendingAdjustment);
        assert_eq!(verdict(&[Listed], WindowTab::Sell, &catalog), ClusterVerdict::NotATrade);
        assert_eq!(verdict(&[Listed, Withdrew], WindowTab::Sell, &catalog), ClusterVerdict::NotATrade);
    }
}
