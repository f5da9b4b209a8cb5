//! Turning extracted log entries into trade candidates: clustering,
//! side/case classification, quantity/price reconciliation and plausibility.

pub mod classify;
pub mod cluster;
pub mod config;
pub mod plausibility;
pub mod reconcile;

pub use classify::{classify, ClusterVerdict};
pub use cluster::{build_clusters, Cluster};
pub use config::ReconstructConfig;
pub use reconcile::{
    counter_deltas, infer_from_counters, reconcile, AnchorText, Candidate, CounterDelta,
    CounterDeltas, DiscardReason,
};
