//! Consortium request handling
//!
//! Glue between the ledger engine, the tick store and the consensus clock.
//! Every operation is synchronous; the HTTP layer runs them on the blocking
//! pool.

use aic_core::{
    AicError, Candidate, Document, NotFoundAttestation, Pid, Result, Tick, TickResponse,
    TidAttestation, TidClock, Value,
};
use aic_ledger::LedgerEngine;
use aic_store::TickStore;
use std::sync::Arc;

/// Outcome of resolving a PID
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Current document of a registered identity
    Found(Document),
    /// Signed statement that the identity is unknown
    NotFound(NotFoundAttestation),
}

/// One consortium node
#[derive(Debug, Clone)]
pub struct ConsortiumService {
    engine: Arc<LedgerEngine>,
    store: Arc<dyn TickStore>,
    clock: Arc<TidClock>,
}

impl ConsortiumService {
    /// Assemble a node
    pub fn new(engine: LedgerEngine, store: Arc<dyn TickStore>, clock: TidClock) -> Self {
        Self {
            engine: Arc::new(engine),
            store,
            clock: Arc::new(clock),
        }
    }

    /// Ledger engine of this node
    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Tick store of this node
    pub fn store(&self) -> &Arc<dyn TickStore> {
        &self.store
    }

    /// Fresh consensus tid, signed
    pub fn tid(&self) -> Result<TidAttestation> {
        self.engine.attest_tid(&self.clock.next())
    }

    /// Current document for `pid`, re-signed at a fresh tid
    pub fn resolve(&self, pid: &str) -> Result<Resolution> {
        let did = Pid::parse(pid)?.did();
        let stored = self.store.latest(&did)?;
        let tid = self.clock.next();

        match self.engine.update_tick(&did, &tid, None, stored)? {
            TickResponse::NotFound(attestation) => Ok(Resolution::NotFound(attestation)),
            TickResponse::Tick(tick) => {
                let document = self
                    .engine
                    .tick_to_document(&tick, None)?
                    .ok_or_else(|| AicError::CorruptedStore { did: did.clone() })?;
                Ok(Resolution::Found(document))
            }
        }
    }

    /// Register a genesis document or append a diff for `pid`.
    ///
    /// The new tick is written with a compare-and-swap on the tick it was
    /// derived from. The returned tick is whatever is latest afterwards, which
    /// is a concurrent writer's tick when this write lost the race.
    pub fn submit(&self, pid: &str, body: Value) -> Result<Tick> {
        let did = Pid::parse(pid)?.did();
        let stored = self.store.latest(&did)?;
        let candidate = Candidate::classify(body, stored.is_some())?;
        let prev = stored.as_ref().map(|tick| tick.tid.clone());
        let tid = self.clock.next();

        let tick = match self.engine.update_tick(&did, &tid, Some(candidate), stored)? {
            TickResponse::Tick(tick) => tick,
            TickResponse::NotFound(_) => return Err(AicError::EmptyChain),
        };
        self.store.put_tick(&tick, prev.as_ref())?;

        let latest = self
            .store
            .latest(&did)?
            .ok_or_else(|| AicError::storage(format!("tick for {did} vanished after write")))?;
        if latest.tid == tick.tid {
            tracing::info!(%did, tid = %tick.tid, entries = tick.diffs.len(), "tick accepted");
        } else {
            tracing::info!(%did, tid = %tick.tid, winner = %latest.tid, "concurrent write won");
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aic_core::{ClockId, Diff, Patch, SignatureEnvelope, Tid};
    use aic_store::MemoryTickStore;
    use aic_testkit::{genesis_for, FixedClock, KeyFixture, CHAIN_EPOCH_MICROS};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store that slips a competing tick in right before the first write
    #[derive(Debug)]
    struct RacingStore {
        inner: MemoryTickStore,
        rival: Tick,
        fired: AtomicBool,
    }

    impl TickStore for RacingStore {
        fn latest(&self, did: &str) -> Result<Option<Tick>> {
            self.inner.latest(did)
        }

        fn get(&self, did: &str, tid: &Tid) -> Result<Option<Tick>> {
            self.inner.get(did, tid)
        }

        fn put(&self, did: &str, tid: &Tid, prev: Option<&Tid>, tick_json: &str) -> Result<()> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.inner.put_tick(&self.rival, prev)?;
            }
            self.inner.put(did, tid, prev, tick_json)
        }

        fn history(&self, did: &str) -> Result<Vec<Tid>> {
            self.inner.history(did)
        }
    }

    fn service_at(store: Arc<dyn TickStore>, micros: u64) -> ConsortiumService {
        let engine = LedgerEngine::new(KeyFixture::consortium().shared());
        let clock = TidClock::new(FixedClock::at(micros), ClockId::parse("2c").unwrap());
        ConsortiumService::new(engine, store, clock)
    }

    fn service(store: Arc<dyn TickStore>) -> ConsortiumService {
        service_at(store, CHAIN_EPOCH_MICROS)
    }

    fn registered(service: &ConsortiumService) -> (Pid, Tick) {
        let genesis = genesis_for(&KeyFixture::account(1), None);
        let pid = Pid::of_document(&genesis).unwrap();
        let tick = service
            .submit(pid.as_str(), Value::Object(genesis))
            .unwrap();
        (pid, tick)
    }

    fn signed_diff(prev: &Tid, name: &str) -> Diff {
        let account = KeyFixture::account(1);
        let diff = Diff::new(prev.clone(), vec![Patch::put(["name"], name)], account.did());
        SignatureEnvelope::default()
            .signed(diff, account.keypair())
            .unwrap()
    }

    #[test]
    fn test_resolve_unknown_pid() {
        let service = service(Arc::new(MemoryTickStore::new()));
        let Resolution::NotFound(attestation) = service.resolve("zzzzzzzzzzzzzzzz").unwrap() else {
            panic!("expected not found");
        };
        assert_eq!(attestation.did, "did:aic:zzzzzzzzzzzzzzzz");
        assert!(service
            .engine()
            .envelope()
            .check(&attestation, service.engine().keypair()));
    }

    #[test]
    fn test_register_then_resolve() {
        let service = service(Arc::new(MemoryTickStore::new()));
        let (pid, tick) = registered(&service);
        assert_eq!(tick.did, pid.did());

        let Resolution::Found(document) = service.resolve(pid.as_str()).unwrap() else {
            panic!("expected document");
        };
        assert_eq!(document["id"], Value::String(pid.did()));
        assert_eq!(service.store().history(&pid.did()).unwrap().len(), 1);
    }

    #[test]
    fn test_submit_rejects_malformed_pid() {
        let service = service(Arc::new(MemoryTickStore::new()));
        let err = service.submit("not-a-pid", Value::Null).unwrap_err();
        assert_eq!(err.kind(), "InvalidIdentifier");
    }

    #[test]
    fn test_genesis_may_carry_diff_field_names() {
        let service = service(Arc::new(MemoryTickStore::new()));
        let mut genesis = genesis_for(&KeyFixture::account(1), None);
        genesis.insert("prev".to_string(), Value::String("elsewhere".to_string()));
        genesis.insert("patches".to_string(), Value::Array(Vec::new()));
        let pid = Pid::of_document(&genesis).unwrap();

        let tick = service
            .submit(pid.as_str(), Value::Object(genesis.clone()))
            .unwrap();
        assert_eq!(tick.diffs.genesis_entry().map(|(_, g)| g), Some(&genesis));

        // the same body is now read as a diff, and is not a valid one
        let err = service
            .submit(pid.as_str(), Value::Object(genesis))
            .unwrap_err();
        assert_eq!(err.kind(), "Serialization");
    }

    #[test]
    fn test_lost_race_returns_winner() {
        let base = service(Arc::new(MemoryTickStore::new()));
        let (pid, genesis_tick) = registered(&base);
        let genesis_tid = genesis_tick.diffs.genesis_tid().unwrap().clone();

        // another node extends the same stored tick first
        let rival_tid = Tid::from_parts(CHAIN_EPOCH_MICROS + 500_000, &ClockId::parse("3z").unwrap());
        let mut rival_diffs = genesis_tick.diffs.clone();
        rival_diffs
            .append(rival_tid.clone(), signed_diff(&genesis_tid, "rival"))
            .unwrap();
        let rival = base.engine().tick_from_diffs(rival_diffs, &rival_tid).unwrap();

        let inner = MemoryTickStore::new();
        inner.put_tick(&genesis_tick, None).unwrap();
        let racing = service_at(
            Arc::new(RacingStore {
                inner,
                rival: rival.clone(),
                fired: AtomicBool::new(false),
            }),
            CHAIN_EPOCH_MICROS + 1_000_000,
        );

        let body = serde_json::to_value(signed_diff(&genesis_tid, "loser")).unwrap();
        let winner = racing.submit(pid.as_str(), body).unwrap();
        assert_eq!(winner.tid, rival.tid);
        assert_eq!(racing.store().history(&pid.did()).unwrap().len(), 2);
    }
}
