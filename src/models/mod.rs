pub mod entry;
pub mod sample;
pub mod transaction;

pub use entry::{EntryKind, LogEntry};
pub use sample::{ItemCounter, Sample, UiCounters, WindowTab};
pub use transaction::{Case, Provenance, Side, TradeKey, Transaction};

/// Canonical minute-granularity rendering used for storage and state keys.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
