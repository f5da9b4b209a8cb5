//! SQLite trade store: the durable half of the dedup contract.

mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{content_hash, InsertOutcome, TradeRecord};
