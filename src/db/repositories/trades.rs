use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{
        conversion_error, format_timestamp, parse_case, parse_provenance, parse_side,
        parse_timestamp, to_i64, to_u32, to_u64,
    },
    models::{InsertOutcome, TradeRecord},
    repositories::process_state::put_state,
};
use crate::models::{TradeKey, Transaction};

fn row_to_trade(row: &Row) -> Result<TradeRecord, rusqlite::Error> {
    let timestamp: String = row.get("timestamp")?;
    let side: String = row.get("side")?;
    let case: String = row.get("trade_case")?;
    let provenance: String = row.get("provenance")?;
    let recorded_at: String = row.get("recorded_at")?;

    let transaction = Transaction {
        item_name: row.get("item_name")?,
        quantity: to_u32(row.get("quantity")?, "quantity").map_err(conversion_error)?,
        price: to_u64(row.get("price")?, "price").map_err(conversion_error)?,
        timestamp: parse_timestamp(&timestamp, "timestamp").map_err(conversion_error)?,
        side: parse_side(&side).map_err(conversion_error)?,
        case: parse_case(&case).map_err(conversion_error)?,
        occurrence_index: to_u32(row.get("occurrence_index")?, "occurrence_index")
            .map_err(conversion_error)?,
        provenance: parse_provenance(&provenance).map_err(conversion_error)?,
    };

    Ok(TradeRecord {
        id: Some(row.get("id")?),
        transaction,
        content_hash: row.get("content_hash")?,
        recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(e.into()))?,
    })
}

impl Database {
    /// Rows stored for a trade key, across all cases and occurrence indices.
    pub async fn count_trade_rows(&self, key: &TradeKey) -> Result<u32> {
        let key = key.clone();
        self.execute(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM trades
                     WHERE item_name = ?1 AND quantity = ?2 AND price = ?3
                       AND side = ?4 AND timestamp = ?5",
                    params![
                        key.item_name,
                        key.quantity,
                        to_i64(key.price)?,
                        key.side.as_str(),
                        format_timestamp(&key.timestamp),
                    ],
                    |row| row.get(0),
                )
                .context("failed to count trade rows")?;
            to_u32(count, "row count")
        })
        .await
    }

    /// Persist the occurrence state, then insert the trade, in one
    /// transaction. A conflicting row is reported as a duplicate.
    pub async fn commit_trade(
        &self,
        record: TradeRecord,
        occurrence_state: String,
    ) -> Result<InsertOutcome> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            put_state(&tx, crate::baseline::snapshot::OCCURRENCE_STATE, &occurrence_state)
                .context("failed to save occurrence state")?;

            let trade = &record.transaction;
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO trades (
                        item_name,
                        quantity,
                        price,
                        side,
                        timestamp,
                        trade_case,
                        occurrence_index,
                        content_hash,
                        provenance,
                        recorded_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        trade.item_name,
                        trade.quantity,
                        to_i64(trade.price)?,
                        trade.side.as_str(),
                        format_timestamp(&trade.timestamp),
                        trade.case.as_str(),
                        trade.occurrence_index,
                        record.content_hash,
                        trade.provenance.as_str(),
                        record.recorded_at.to_rfc3339(),
                    ],
                )
                .context("failed to insert trade")?;

            let outcome = if inserted == 0 {
                InsertOutcome::Duplicate
            } else {
                InsertOutcome::Inserted(tx.last_insert_rowid())
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    /// Stored trades, oldest first.
    pub async fn list_trades(&self) -> Result<Vec<TradeRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, item_name, quantity, price, side, timestamp, trade_case,
                        occurrence_index, content_hash, provenance, recorded_at
                 FROM trades
                 ORDER BY timestamp ASC, id ASC",
            )?;

            let trades = stmt
                .query_map([], row_to_trade)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(trades)
        })
        .await
    }
}
