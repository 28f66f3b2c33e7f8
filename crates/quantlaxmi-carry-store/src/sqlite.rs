//! SQLite history database.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::history::{CycleBatch, HistorySink};
use crate::table::{header, timestamp, HistoryRow, CYCLE_TS_COLUMN};
use quantlaxmi_carry::{CarryRecord, SpreadRecord};
use quantlaxmi_connectors_moex::FuturesSnapshotRow;

fn create_table_sql<R: HistoryRow>() -> String {
    let columns: Vec<String> = std::iter::once(format!("{CYCLE_TS_COLUMN} TEXT NOT NULL"))
        .chain(
            R::COLUMNS
                .iter()
                .map(|(name, ty)| format!("{name} {}", ty.sql())),
        )
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    {}\n)",
        R::TABLE,
        columns.join(",\n    ")
    )
}

fn insert_sql<R: HistoryRow>() -> String {
    let columns = header::<R>();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::TABLE,
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Create history tables and indexes if missing.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    for sql in [
        create_table_sql::<FuturesSnapshotRow>(),
        create_table_sql::<CarryRecord>(),
        create_table_sql::<SpreadRecord>(),
    ] {
        conn.execute(&sql, [])?;
    }
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_carry_cycle ON carry(cycle_ts)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_spread_cycle ON spread(cycle_ts)",
        [],
    )?;
    Ok(())
}

/// Insert statement and bound values for one table of a staged cycle.
struct PendingTable {
    sql: String,
    rows: Vec<Vec<Value>>,
}

fn pending_table<R: HistoryRow>(cycle_ts: &Value, rows: &[R]) -> PendingTable {
    PendingTable {
        sql: insert_sql::<R>(),
        rows: rows
            .iter()
            .map(|row| std::iter::once(cycle_ts.clone()).chain(row.values()).collect())
            .collect(),
    }
}

fn insert_rows(tx: &Transaction<'_>, table: &PendingTable) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(&table.sql)?;
    for values in &table.rows {
        stmt.execute(params_from_iter(values.iter()))?;
    }
    Ok(())
}

pub struct SqliteHistory {
    conn: Connection,
    pending: Option<(NaiveDateTime, Vec<PendingTable>)>,
}

impl SqliteHistory {
    /// Open (or create) the database file, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            pending: None,
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            pending: None,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Rows in `table`, optionally restricted to one cycle.
    pub fn count(&self, table: &str, cycle_ts: Option<&str>) -> StoreResult<i64> {
        let n = match cycle_ts {
            Some(ts) => self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE cycle_ts = ?1"),
                [ts],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?,
        };
        Ok(n)
    }
}

impl HistorySink for SqliteHistory {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn stage(&mut self, batch: &CycleBatch<'_>) -> StoreResult<()> {
        let cycle_ts = timestamp(batch.cycle_ts);
        self.pending = Some((
            batch.cycle_ts,
            vec![
                pending_table(&cycle_ts, batch.futures),
                pending_table(&cycle_ts, batch.carry),
                pending_table(&cycle_ts, batch.spreads),
            ],
        ));
        Ok(())
    }

    /// All three tables in one transaction; nothing is written on error.
    fn commit(&mut self) -> StoreResult<()> {
        let Some((cycle_ts, tables)) = self.pending.take() else {
            return Ok(());
        };
        let tx = self.conn.transaction()?;
        for table in &tables {
            insert_rows(&tx, table)?;
        }
        tx.commit()?;

        info!(
            cycle_ts = %cycle_ts,
            futures = tables[0].rows.len(),
            carry = tables[1].rows.len(),
            spreads = tables[2].rows.len(),
            "[STORE] Cycle appended to SQLite"
        );
        Ok(())
    }

    fn rollback(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql::<SpreadRecord>();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS spread"));
        assert!(sql.contains("cycle_ts TEXT NOT NULL"));
        assert!(sql.contains("spread_carry_pct_annualized REAL"));
    }

    #[test]
    fn test_insert_sql_placeholders() {
        let sql = insert_sql::<SpreadRecord>();
        assert!(sql.starts_with("INSERT INTO spread (cycle_ts, underlying_code"));
        assert!(sql.ends_with("?10)"));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let store = SqliteHistory::open_in_memory().unwrap();
        init_schema(store.connection()).unwrap();
        assert_eq!(store.count("carry", None).unwrap(), 0);
        assert_eq!(store.count("futures", None).unwrap(), 0);
    }
}
