use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};

use crate::db::connection::Database;

/// Upsert one process-state value on an open connection or transaction.
pub(crate) fn put_state(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO process_state (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

impl Database {
    /// Every persisted process-state value.
    pub async fn load_process_state(&self) -> Result<HashMap<String, String>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM process_state")?;
            let state = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<HashMap<_, _>, _>>()
                .context("failed to read process state")?;
            Ok(state)
        })
        .await
    }

    /// Write several values atomically.
    pub async fn save_process_state(&self, entries: Vec<(String, String)>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for (key, value) in &entries {
                put_state(&tx, key, value)
                    .with_context(|| format!("failed to save process state {key}"))?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
