//! Diff chain builders
//!
//! Builds signed chains with well-formed, increasing tids so ledger and
//! server tests can describe histories (including forks and bad
//! signatures) in a few lines.

use crate::keys::KeyFixture;
use crate::time::FixedClock;
use aic_core::{
    ClockId, Diff, Diffs, Document, Patch, Pid, SignatureEnvelope, Tid, TidClock, Value,
    ACCOUNT_KEYS, RECOVERY_KEYS,
};

/// Wall-clock reading of the first tid a builder hands out
pub const CHAIN_EPOCH_MICROS: u64 = 1_650_000_000_000_000;

/// Turn a `json!` object into a document
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Genesis document listing one account key and optionally a recovery key
pub fn genesis_for(account: &KeyFixture, recovery: Option<&KeyFixture>) -> Document {
    let mut genesis = Document::new();
    genesis.insert(
        ACCOUNT_KEYS.to_string(),
        Value::Array(vec![Value::String(account.did().to_string())]),
    );
    if let Some(recovery) = recovery {
        genesis.insert(
            RECOVERY_KEYS.to_string(),
            Value::Array(vec![Value::String(recovery.did().to_string())]),
        );
    }
    genesis
}

/// Builder for a signed diff chain
#[derive(Debug)]
pub struct ChainBuilder {
    wall: FixedClock,
    clock: TidClock,
    envelope: SignatureEnvelope,
    diffs: Diffs,
    head: Tid,
}

impl ChainBuilder {
    /// Chain starting at `genesis`
    pub fn new(genesis: Document) -> Self {
        let wall = FixedClock::at(CHAIN_EPOCH_MICROS);
        let clock = TidClock::new(wall.clone(), ClockId::parse("22").unwrap());
        let head = clock.next();
        Self {
            wall,
            clock,
            envelope: SignatureEnvelope::default(),
            diffs: Diffs::genesis(head.clone(), genesis),
            head,
        }
    }

    /// Sign diffs under a different envelope
    pub fn with_envelope(mut self, envelope: SignatureEnvelope) -> Self {
        self.envelope = envelope;
        self
    }

    /// did of the genesis document
    pub fn did(&self) -> String {
        let (_, genesis) = self.diffs.genesis_entry().unwrap();
        Pid::of_document_in(genesis, self.envelope.form())
            .unwrap()
            .did()
    }

    /// Genesis tid
    pub fn genesis_tid(&self) -> Tid {
        self.diffs.genesis_tid().cloned().unwrap()
    }

    /// Tid of the entry the next [`push`](Self::push) extends
    pub fn head(&self) -> &Tid {
        &self.head
    }

    /// Next tid without adding an entry
    pub fn next_tid(&self) -> Tid {
        self.wall.advance(1_000);
        self.clock.next()
    }

    /// Diff extending `prev`, signed by `signer`
    pub fn signed_diff(&self, signer: &KeyFixture, prev: &Tid, patches: Vec<Patch>) -> Diff {
        let diff = Diff::new(prev.clone(), patches, signer.did());
        self.envelope.signed(diff, signer.keypair()).unwrap()
    }

    /// Append a signed diff extending the head and move the head to it
    pub fn push(&mut self, signer: &KeyFixture, patches: Vec<Patch>) -> Tid {
        let prev = self.head.clone();
        let tid = self.push_at(&prev, signer, patches);
        self.head = tid.clone();
        tid
    }

    /// Append a signed diff extending `prev`, leaving the head alone
    pub fn push_at(&mut self, prev: &Tid, signer: &KeyFixture, patches: Vec<Patch>) -> Tid {
        let diff = self.signed_diff(signer, prev, patches);
        self.push_raw(diff)
    }

    /// Append a diff as given
    pub fn push_raw(&mut self, diff: Diff) -> Tid {
        let tid = self.next_tid();
        self.diffs.append(tid.clone(), diff).unwrap();
        tid
    }

    /// Current chain
    pub fn diffs(&self) -> &Diffs {
        &self.diffs
    }

    /// Finish the chain
    pub fn build(self) -> Diffs {
        self.diffs
    }
}
