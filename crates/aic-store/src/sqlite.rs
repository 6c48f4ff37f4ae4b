//! Persistent tick store using `SQLite`.
//!
//! # Schema
//!
//! The `ticks` table has columns `did`, `tid` and `tick` (the signed tick
//! JSON), keyed by `(did, tid)`. Tids sort as text, so `MAX(tid)` is the
//! latest tick.
//!
//! Every write is a single `INSERT OR IGNORE ... SELECT ... WHERE` statement
//! inside an immediate transaction, which makes the compare-and-swap atomic
//! across connections and processes sharing the database file.

use crate::{parse_tick, Result, StoreErrorBuilder, TickStore};
use aic_core::{Tick, Tid};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS ticks (
        did  TEXT NOT NULL,
        tid  TEXT NOT NULL,
        tick TEXT NOT NULL,
        PRIMARY KEY (did, tid)
    );
";

const INSERT_FIRST: &str = "INSERT OR IGNORE INTO ticks (did, tid, tick) VALUES (?1, ?2, ?3)";

const INSERT_IF_LATEST: &str = "
    INSERT OR IGNORE INTO ticks (did, tid, tick)
    SELECT ?1, ?2, ?3
    WHERE (SELECT MAX(tid) FROM ticks WHERE did = ?1) = ?4
";

/// How long a connection waits for another writer's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable tick store backed by `SQLite`
#[derive(Debug, Clone)]
pub struct SqliteTickStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTickStore {
    /// Open (creating if needed) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StoreErrorBuilder::open_failed(path, e))?;
        Self::init(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreErrorBuilder::sqlite)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(StoreErrorBuilder::sqlite)?;
        conn.execute_batch(SCHEMA)
            .map_err(StoreErrorBuilder::sqlite)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn query_tick(&self, did: &str, sql: &str, args: impl rusqlite::Params) -> Result<Option<Tick>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row(sql, args, |row| row.get(0))
            .optional()
            .map_err(StoreErrorBuilder::sqlite)?;
        json.map(|json| parse_tick(did, &json)).transpose()
    }
}

impl TickStore for SqliteTickStore {
    fn latest(&self, did: &str) -> Result<Option<Tick>> {
        self.query_tick(
            did,
            "SELECT tick FROM ticks WHERE did = ?1 ORDER BY tid DESC LIMIT 1",
            params![did],
        )
    }

    fn get(&self, did: &str, tid: &Tid) -> Result<Option<Tick>> {
        self.query_tick(
            did,
            "SELECT tick FROM ticks WHERE did = ?1 AND tid = ?2",
            params![did, tid.as_str()],
        )
    }

    fn put(&self, did: &str, tid: &Tid, prev: Option<&Tid>, tick_json: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreErrorBuilder::sqlite)?;
        let inserted = match prev {
            None => tx.execute(INSERT_FIRST, params![did, tid.as_str(), tick_json]),
            Some(prev) => tx.execute(
                INSERT_IF_LATEST,
                params![did, tid.as_str(), tick_json, prev.as_str()],
            ),
        }
        .map_err(StoreErrorBuilder::sqlite)?;
        tx.commit().map_err(StoreErrorBuilder::sqlite)?;

        if inserted == 0 {
            tracing::debug!(%did, %tid, prev = ?prev, "compare-and-swap lost");
        }
        Ok(())
    }

    fn history(&self, did: &str) -> Result<Vec<Tid>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT tid FROM ticks WHERE did = ?1 ORDER BY tid ASC")
            .map_err(StoreErrorBuilder::sqlite)?;
        let tids = stmt
            .query_map(params![did], |row| row.get::<_, String>(0))
            .map_err(StoreErrorBuilder::sqlite)?
            .map(|tid| tid.map(Tid::new))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreErrorBuilder::sqlite)?;
        Ok(tids)
    }
}
