pub mod trade;

pub use trade::{content_hash, InsertOutcome, TradeRecord};
