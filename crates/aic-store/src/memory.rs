//! In-memory tick store for tests and single-process deployments

use crate::{parse_tick, Result, TickStore};
use aic_core::{Tick, Tid};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// Mutex-guarded map of did to tid-ordered tick rows
#[derive(Debug, Default)]
pub struct MemoryTickStore {
    rows: Mutex<HashMap<String, BTreeMap<Tid, String>>>,
}

impl MemoryTickStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickStore for MemoryTickStore {
    fn latest(&self, did: &str) -> Result<Option<Tick>> {
        let rows = self.rows.lock();
        rows.get(did)
            .and_then(|ticks| ticks.values().next_back())
            .map(|json| parse_tick(did, json))
            .transpose()
    }

    fn get(&self, did: &str, tid: &Tid) -> Result<Option<Tick>> {
        let rows = self.rows.lock();
        rows.get(did)
            .and_then(|ticks| ticks.get(tid))
            .map(|json| parse_tick(did, json))
            .transpose()
    }

    fn put(&self, did: &str, tid: &Tid, prev: Option<&Tid>, tick_json: &str) -> Result<()> {
        let mut rows = self.rows.lock();
        let ticks = rows.entry(did.to_string()).or_default();
        if let Some(prev) = prev {
            let current = ticks.keys().next_back();
            if current != Some(prev) {
                tracing::debug!(%did, %tid, %prev, ?current, "compare-and-swap lost");
                return Ok(());
            }
        }
        ticks
            .entry(tid.clone())
            .or_insert_with(|| tick_json.to_string());
        Ok(())
    }

    fn history(&self, did: &str) -> Result<Vec<Tid>> {
        let rows = self.rows.lock();
        Ok(rows
            .get(did)
            .map(|ticks| ticks.keys().cloned().collect())
            .unwrap_or_default())
    }
}
