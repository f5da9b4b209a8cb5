use chrono::NaiveDateTime;

use crate::models::{EntryKind, LogEntry};

use super::config::ReconstructConfig;

/// Entries believed to describe one real-world transaction.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub entries: Vec<LogEntry>,
    /// Sealed clusters (priced purchases) never take on more members.
    sealed: bool,
}

impl Cluster {
    fn singleton(entry: LogEntry, sealed: bool) -> Self {
        Self {
            entries: vec![entry],
            sealed,
        }
    }

    pub fn item_name(&self) -> Option<&str> {
        self.entries.first().and_then(|e| e.item_name.as_deref())
    }

    /// Highest-priority member; earlier entries win ties.
    pub fn anchor(&self) -> &LogEntry {
        self.entries
            .iter()
            .min_by_key(|e| e.kind.anchor_priority())
            .expect("cluster always holds at least one entry")
    }

    pub fn has(&self, kind: EntryKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    pub fn first_of(&self, kind: EntryKind) -> Option<&LogEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn latest_timestamp(&self) -> Option<NaiveDateTime> {
        self.entries.iter().filter_map(|e| e.timestamp).max()
    }

    fn first_offset(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.byte_offset)
            .min()
            .unwrap_or(usize::MAX)
    }

    /// Each lifecycle kind appears at most once per cluster; a second
    /// completion line for the same item is a second trade.
    fn conflicts_with(&self, kind: EntryKind) -> bool {
        match kind {
            EntryKind::Other => false,
            EntryKind::Transaction
            | EntryKind::Purchased
            | EntryKind::Placed
            | EntryKind::Listed
            | EntryKind::Withdrew => self.has(kind),
        }
    }

    fn compatible_with(&self, other: &Cluster) -> bool {
        !self.sealed
            && !other.sealed
            && self.item_name().is_some()
            && self.item_name() == other.item_name()
            && other.entries.iter().all(|e| !self.conflicts_with(e.kind))
    }
}

/// Group entries by item and time proximity.
///
/// Priced purchases stay singletons. Everything else joins the first
/// compatible cluster holding a member within the active window, then linked
/// clusters are merged until nothing changes.
pub fn build_clusters(
    entries: Vec<LogEntry>,
    config: &ReconstructConfig,
    first_scan: bool,
) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for entry in entries {
        if entry.kind == EntryKind::Purchased && entry.price.is_some() {
            clusters.push(Cluster::singleton(entry, true));
            continue;
        }
        if entry.item_name.is_none() {
            clusters.push(Cluster::singleton(entry, false));
            continue;
        }

        let target = clusters.iter().position(|cluster| {
            !cluster.sealed
                && cluster.item_name() == entry.item_name.as_deref()
                && !cluster.conflicts_with(entry.kind)
                && cluster
                    .entries
                    .iter()
                    .any(|member| within_window(member, &entry, config, first_scan))
        });

        match target {
            Some(idx) => clusters[idx].entries.push(entry),
            None => clusters.push(Cluster::singleton(entry, false)),
        }
    }

    let mut clusters = merge_linked(clusters, config, first_scan);
    for cluster in &mut clusters {
        cluster.entries.sort_by_key(|e| e.byte_offset);
    }
    clusters.sort_by_key(Cluster::first_offset);
    clusters
}

/// Keep merging linked, compatible clusters until no more merges are possible.
fn merge_linked(
    mut clusters: Vec<Cluster>,
    config: &ReconstructConfig,
    first_scan: bool,
) -> Vec<Cluster> {
    loop {
        let mut merged = false;

        'outer: for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                let linked = clusters[i].compatible_with(&clusters[j])
                    && clusters[i].entries.iter().any(|a| {
                        clusters[j]
                            .entries
                            .iter()
                            .any(|b| within_window(a, b, config, first_scan))
                    });

                if linked {
                    let absorbed = clusters.remove(j);
                    clusters[i].entries.extend(absorbed.entries);
                    merged = true;
                    break 'outer;
                }
            }
        }

        if !merged {
            return clusters;
        }
    }
}

fn window_secs(a: EntryKind, b: EntryKind, config: &ReconstructConfig, first_scan: bool) -> i64 {
    let pair = match (a, b) {
        (EntryKind::Placed, EntryKind::Withdrew) | (EntryKind::Withdrew, EntryKind::Placed) => {
            config.withdraw_pair_window_secs
        }
        _ => config.normal_window_secs,
    };

    if first_scan {
        pair.max(config.first_scan_window_secs)
    } else {
        pair
    }
}

fn within_window(
    a: &LogEntry,
    b: &LogEntry,
    config: &ReconstructConfig,
    first_scan: bool,
) -> bool {
    match a.seconds_apart(b) {
        Some(delta) => delta < window_secs(a.kind, b.kind, config, first_scan),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(offset: usize, kind: EntryKind, item: &str, minute: u32, price: Option<u64>) -> LogEntry {
        LogEntry {
            byte_offset: offset,
            raw_timestamp_text: format!("2025.10.12 04:{minute:02}"),
            kind,
            item_name: Some(item.to_string()),
            quantity: Some(1),
            price,
            timestamp: NaiveDate::from_ymd_opt(2025, 10, 12)
                .unwrap()
                .and_hms_opt(4, minute, 0),
            raw_text: format!("{} {item}", kind.as_str()),
            sold_marker: false,
        }
    }

    #[test]
    fn groups_same_item_same_minute_regardless_of_order() {
        let entries = vec![
            entry(0, EntryKind::Transaction, "Shard", 4, Some(10)),
            entry(10, EntryKind::Listed, "Shard", 4, Some(10)),
            entry(20, EntryKind::Listed, "Stone", 4, Some(10)),
        ];
        let clusters = build_clusters(entries, &ReconstructConfig::default(), false);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].entries.len(), 2);
        assert_eq!(clusters[0].anchor().kind, EntryKind::Transaction);
        assert_eq!(clusters[1].item_name(), Some("Stone"));
    }

    #[test]
    fn priced_purchases_never_merge() {
        let entries = vec![
            entry(0, EntryKind::Purchased, "Shard", 4, Some(10)),
            entry(10, EntryKind::Purchased, "Shard", 4, Some(12)),
            entry(20, EntryKind::Placed, "Shard", 4, Some(10)),
        ];
        let clusters = build_clusters(entries, &ReconstructConfig::default(), false);
        assert_eq!(clusters.len(), 3);
        assert!(clusters[0].sealed);
        assert!(clusters[1].sealed);
    }

    #[test]
    fn repeated_completions_are_separate_clusters() {
        let entries = vec![
            entry(0, EntryKind::Transaction, "Shard", 4, Some(10)),
            entry(10, EntryKind::Transaction, "Shard", 4, Some(10)),
        ];
        let clusters = build_clusters(entries, &ReconstructConfig::default(), false);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn minutes_apart_only_cluster_during_first_scan() {
        let entries = || {
            vec![
                entry(0, EntryKind::Listed, "Shard", 1, Some(10)),
                entry(10, EntryKind::Transaction, "Shard", 4, Some(10)),
            ]
        };
        let config = ReconstructConfig::default();
        assert_eq!(build_clusters(entries(), &config, false).len(), 2);
        assert_eq!(build_clusters(entries(), &config, true).len(), 1);
    }

    #[test]
    fn transitive_links_merge() {
        // The order and the completion start separate clusters; the withdrawal
        // pairs with the order and shares a minute with the completion.
        let mut config = ReconstructConfig::default();
        config.normal_window_secs = 1;
        config.withdraw_pair_window_secs = 120;
        let entries = vec![
            entry(0, EntryKind::Placed, "Shard", 4, Some(10)),
            entry(10, EntryKind::Transaction, "Shard", 5, Some(10)),
            entry(20, EntryKind::Withdrew, "Shard", 5, Some(10)),
        ];
        let clusters = build_clusters(entries, &config, false);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].entries.len(), 3);
    }

    #[test]
    fn nameless_entries_are_kept_as_singletons() {
        let mut nameless = entry(0, EntryKind::Other, "x", 4, None);
        nameless.item_name = None;
        let clusters = build_clusters(vec![nameless], &ReconstructConfig::default(), false);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].item_name(), None);
    }
}
