//! AIC Store - tick persistence
//!
//! One row per `(did, tid)` holding the signed tick JSON. The latest tick
//! of an identity is the row with the greatest tid. Writers race through a
//! compare-and-swap on that greatest tid: a write naming a stale `prev`
//! inserts nothing and is not an error, so callers always re-read
//! [`TickStore::latest`] to learn which write won.

#![forbid(unsafe_code)]

/// Store errors
pub mod error;

/// In-memory store
pub mod memory;

/// SQLite store
pub mod sqlite;

pub use error::{Result, StoreErrorBuilder};
pub use memory::MemoryTickStore;
pub use sqlite::SqliteTickStore;

use aic_core::{AicError, Tick, Tid};
use std::fmt;

/// Persistence for signed ticks
pub trait TickStore: Send + Sync + fmt::Debug {
    /// Tick with the greatest tid for `did`
    fn latest(&self, did: &str) -> Result<Option<Tick>>;

    /// Tick stored at exactly `tid`
    fn get(&self, did: &str, tid: &Tid) -> Result<Option<Tick>>;

    /// Store `tick_json` at `(did, tid)`.
    ///
    /// With `prev == None` the row is inserted unless that exact
    /// `(did, tid)` already exists. Otherwise it is inserted only while
    /// `prev` is still the greatest tid for `did`; a lost race returns
    /// `Ok(())` without writing.
    fn put(&self, did: &str, tid: &Tid, prev: Option<&Tid>, tick_json: &str) -> Result<()>;

    /// Every stored tid for `did`, ascending
    fn history(&self, did: &str) -> Result<Vec<Tid>>;

    /// Serialize and [`put`](Self::put) a tick under its own did and tid
    fn put_tick(&self, tick: &Tick, prev: Option<&Tid>) -> Result<()> {
        let json = serde_json::to_string(tick)?;
        self.put(&tick.did, &tick.tid, prev, &json)
    }
}

/// Parse a stored row; damaged JSON is a storage failure, not a bad request
pub(crate) fn parse_tick(did: &str, json: &str) -> Result<Tick> {
    serde_json::from_str(json).map_err(|e| {
        AicError::storage(format!("stored tick for {did} does not parse: {e}"))
    })
}
