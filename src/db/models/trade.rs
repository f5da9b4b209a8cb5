//! Stored trade row.
//!
//! The store's uniqueness constraint covers every contract field plus the
//! content hash; provenance and the recording time are bookkeeping only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{Transaction, TIMESTAMP_FORMAT};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: Option<i64>,
    #[serde(flatten)]
    pub transaction: Transaction,
    pub content_hash: String,
    pub recorded_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            id: None,
            content_hash: content_hash(&transaction),
            transaction,
            recorded_at: Utc::now(),
        }
    }
}

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// A row with the same contract fields already exists.
    Duplicate,
}

/// SHA-256 hex digest over the canonical row fields.
pub fn content_hash(transaction: &Transaction) -> String {
    let canonical = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        transaction.item_name,
        transaction.quantity,
        transaction.price,
        transaction.side.as_str(),
        transaction.timestamp.format(TIMESTAMP_FORMAT),
        transaction.case.as_str(),
        transaction.occurrence_index,
    );
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}
