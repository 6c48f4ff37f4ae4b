//! Tick Store Tests
//!
//! The same behavioural suite runs against the in-memory and SQLite stores,
//! plus concurrency tests for the compare-and-swap write.

use aic_core::{AicError, ClockId, Diffs, Tick, Tid, TidClock};
use aic_store::{MemoryTickStore, SqliteTickStore, TickStore};
use aic_testkit::{genesis_for, FixedClock, KeyFixture, CHAIN_EPOCH_MICROS};
use std::sync::{Arc, Barrier};
use std::thread;

const DID: &str = "did:aic:zkug3v3btzimdf4d";

fn clock() -> TidClock {
    TidClock::new(FixedClock::at(CHAIN_EPOCH_MICROS), ClockId::parse("2c").unwrap())
}

fn tick(tid: &Tid, marker: &str) -> Tick {
    let mut genesis = genesis_for(&KeyFixture::account(1), None);
    genesis.insert("marker".to_string(), marker.into());
    Tick {
        tid: tid.clone(),
        did: DID.to_string(),
        diffs: Diffs::genesis(tid.clone(), genesis),
        key: KeyFixture::consortium().did().to_string(),
        sig: String::new(),
    }
}

fn marker(tick: &Tick) -> String {
    let (_, genesis) = tick.diffs.genesis_entry().unwrap();
    genesis["marker"].as_str().unwrap().to_string()
}

fn check_first_write_and_duplicates(store: &dyn TickStore) {
    let clock = clock();
    assert_eq!(store.latest(DID).unwrap(), None);

    let first = clock.next();
    store.put_tick(&tick(&first, "one"), None).unwrap();
    store.put_tick(&tick(&first, "two"), None).unwrap();

    let latest = store.latest(DID).unwrap().unwrap();
    assert_eq!(latest.tid, first);
    assert_eq!(marker(&latest), "one");
    assert_eq!(store.latest("did:aic:zzzzzzzzzzzzzzzz").unwrap(), None);
}

fn check_compare_and_swap(store: &dyn TickStore) {
    let clock = clock();
    let genesis = clock.next();
    store.put_tick(&tick(&genesis, "genesis"), None).unwrap();

    let second = clock.next();
    store.put_tick(&tick(&second, "second"), Some(&genesis)).unwrap();
    assert_eq!(store.latest(DID).unwrap().unwrap().tid, second);

    // prev is no longer the latest: nothing is written, no error
    let stale = clock.next();
    store.put_tick(&tick(&stale, "stale"), Some(&genesis)).unwrap();
    assert_eq!(store.latest(DID).unwrap().unwrap().tid, second);
    assert_eq!(store.get(DID, &stale).unwrap(), None);

    assert_eq!(store.history(DID).unwrap(), vec![genesis.clone(), second.clone()]);
    assert_eq!(marker(&store.get(DID, &genesis).unwrap().unwrap()), "genesis");
    assert!(store.history("did:aic:zzzzzzzzzzzzzzzz").unwrap().is_empty());
}

fn check_single_winner(stores: Vec<Arc<dyn TickStore>>) {
    let clock = clock();
    let genesis = clock.next();
    stores[0].put_tick(&tick(&genesis, "genesis"), None).unwrap();

    let barrier = Arc::new(Barrier::new(stores.len()));
    let handles: Vec<_> = stores
        .into_iter()
        .enumerate()
        .map(|(i, store)| {
            let tid = clock.next();
            let genesis = genesis.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .put_tick(&tick(&tid, &format!("writer {i}")), Some(&genesis))
                    .unwrap();
                store
            })
        })
        .collect();
    let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let history = stores[0].history(DID).unwrap();
    assert_eq!(history.len(), 2, "exactly one writer extends genesis: {history:?}");
    let winner = stores[0].latest(DID).unwrap().unwrap();
    for store in &stores {
        assert_eq!(store.latest(DID).unwrap().unwrap().tid, winner.tid);
    }
}

#[test]
fn test_memory_first_write_and_duplicates() {
    check_first_write_and_duplicates(&MemoryTickStore::new());
}

#[test]
fn test_memory_compare_and_swap() {
    check_compare_and_swap(&MemoryTickStore::new());
}

#[test]
fn test_memory_single_winner() {
    let store: Arc<dyn TickStore> = Arc::new(MemoryTickStore::new());
    check_single_winner((0..8).map(|_| Arc::clone(&store)).collect());
}

#[test]
fn test_memory_damaged_row() {
    let store = MemoryTickStore::new();
    store.put(DID, &Tid::new("2"), None, "{not json").unwrap();
    assert!(matches!(store.latest(DID), Err(AicError::Storage { .. })));
}

#[test]
fn test_sqlite_first_write_and_duplicates() {
    check_first_write_and_duplicates(&SqliteTickStore::open_in_memory().unwrap());
}

#[test]
fn test_sqlite_compare_and_swap() {
    check_compare_and_swap(&SqliteTickStore::open_in_memory().unwrap());
}

#[test]
fn test_sqlite_single_winner_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticks.db");
    let stores: Vec<Arc<dyn TickStore>> = (0..6)
        .map(|_| Arc::new(SqliteTickStore::open(&path).unwrap()) as Arc<dyn TickStore>)
        .collect();
    check_single_winner(stores);
}

#[test]
fn test_sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticks.db");
    let tid = clock().next();
    {
        let store = SqliteTickStore::open(&path).unwrap();
        store.put_tick(&tick(&tid, "durable"), None).unwrap();
    }
    let reopened = SqliteTickStore::open(&path).unwrap();
    let latest = reopened.latest(DID).unwrap().unwrap();
    assert_eq!(latest.tid, tid);
    assert_eq!(marker(&latest), "durable");
}

#[test]
fn test_sqlite_damaged_row() {
    let store = SqliteTickStore::open_in_memory().unwrap();
    store.put(DID, &Tid::new("2"), None, "[]").unwrap();
    assert!(matches!(store.latest(DID), Err(AicError::Storage { .. })));
}
